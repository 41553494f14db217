//! Per-provider pricing.
//!
//! Rates are USD per 1 000 tokens. This table is a tunable: re-confirm
//! against current vendor price sheets when rates change.

use da_domain::error::ProviderType;

#[derive(Debug, Clone, Copy)]
pub struct ProviderRates {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

pub fn rates(provider: ProviderType) -> ProviderRates {
    match provider {
        ProviderType::Openai => ProviderRates {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
        },
        ProviderType::Anthropic => ProviderRates {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        },
        ProviderType::Xai => ProviderRates {
            input_per_1k: 0.005,
            output_per_1k: 0.015,
        },
    }
}

/// Cost of one call in USD.
pub fn cost_usd(provider: ProviderType, input_tokens: u64, output_tokens: u64) -> f64 {
    let r = rates(provider);
    (input_tokens as f64 / 1_000.0) * r.input_per_1k
        + (output_tokens as f64 / 1_000.0) * r.output_per_1k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_cost() {
        let cost = cost_usd(ProviderType::Openai, 1_000, 1_000);
        assert!((cost - 0.04).abs() < 1e-9);
    }

    #[test]
    fn anthropic_is_cheapest_on_input() {
        let a = cost_usd(ProviderType::Anthropic, 10_000, 0);
        let o = cost_usd(ProviderType::Openai, 10_000, 0);
        let x = cost_usd(ProviderType::Xai, 10_000, 0);
        assert!(a < x && x < o);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(cost_usd(ProviderType::Xai, 0, 0), 0.0);
    }
}
