//! Per-debate token and cost budget management.
//!
//! The manager is stateless over its config; all mutable accounting
//! lives in the persisted [`DebateUsage`] record. The orchestrator
//! checks admission before every turn and records actuals after.

use chrono::Utc;
use uuid::Uuid;

use da_domain::config::BudgetConfig;
use da_domain::error::ProviderType;
use da_domain::events::WarningLevel;
use da_domain::stream::Usage;
use da_domain::usage::{DebateUsage, TurnUsage};
use da_providers::pricing;

/// Floor under which a debate cannot meaningfully continue.
const MIN_USEFUL_TOKENS: u64 = 100;

/// Utilization fraction at which the warning escalates to critical.
const CRITICAL_THRESHOLD: f64 = 0.95;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of an admission check.
#[derive(Debug, Clone)]
pub struct BudgetCheck {
    pub admitted: bool,
    pub reason: Option<String>,
    pub tokens_remaining: u64,
    pub estimated_cost_usd: f64,
    pub warning_level: WarningLevel,
}

pub struct BudgetManager {
    config: BudgetConfig,
}

impl BudgetManager {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// The turn-count-derived default budget:
    /// `clamp(100_000, 20_000·N + 5_000·(N+2) + 20_000, 300_000)`.
    pub fn default_budget(turn_count: u8) -> u64 {
        let n = turn_count as u64;
        (20_000 * n + 5_000 * (n + 2) + 20_000).clamp(100_000, 300_000)
    }

    /// The budget for a debate: env override or the derived default.
    pub fn budget_for(&self, turn_count: u8) -> u64 {
        self.config
            .token_budget_per_debate
            .unwrap_or_else(|| Self::default_budget(turn_count))
    }

    /// Admission check for the next turn.
    ///
    /// Denied iff the hard limit is on and the estimate exceeds the
    /// remaining tokens, or a cost limit is set and the estimated cost
    /// would push the cumulative spend over it.
    pub fn check_budget(
        &self,
        usage: &DebateUsage,
        provider: ProviderType,
        estimated_input: u64,
        max_output: u64,
    ) -> BudgetCheck {
        let estimated_total = estimated_input + max_output;
        let remaining = usage.remaining_tokens();
        let estimated_cost = pricing::cost_usd(provider, estimated_input, max_output);

        let mut admitted = true;
        let mut reason = None;

        if self.config.hard_limit && estimated_total > remaining {
            admitted = false;
            reason = Some(format!(
                "estimated {estimated_total} tokens exceeds the {remaining} remaining in budget"
            ));
        } else if let Some(limit) = self.config.cost_limit_usd {
            if usage.cost_usd + estimated_cost > limit {
                admitted = false;
                reason = Some(format!(
                    "estimated cost ${:.4} would exceed the ${limit:.2} cost limit",
                    usage.cost_usd + estimated_cost
                ));
            }
        }

        BudgetCheck {
            admitted,
            reason,
            tokens_remaining: remaining,
            estimated_cost_usd: estimated_cost,
            warning_level: self.warning_level(usage),
        }
    }

    /// Post-turn warning level from current utilization.
    pub fn warning_level(&self, usage: &DebateUsage) -> WarningLevel {
        let utilization = usage.utilization_percent() / 100.0;
        if utilization >= CRITICAL_THRESHOLD {
            WarningLevel::Critical
        } else if utilization >= self.config.warning_threshold {
            WarningLevel::Warning
        } else {
            WarningLevel::None
        }
    }

    /// Fold one turn's actual usage into the tally.
    pub fn record_usage(
        &self,
        usage: &mut DebateUsage,
        turn_id: Uuid,
        provider: ProviderType,
        actual: Usage,
    ) -> TurnUsage {
        let turn_usage = TurnUsage {
            turn_id,
            provider,
            input_tokens: actual.input_tokens,
            output_tokens: actual.output_tokens,
            cost_usd: pricing::cost_usd(provider, actual.input_tokens, actual.output_tokens),
            recorded_at: Utc::now(),
        };
        usage.record(turn_usage.clone());
        turn_usage
    }

    /// Whether the debate should end now on budget grounds.
    pub fn should_end_due_to_budget(&self, usage: &DebateUsage) -> bool {
        if usage.remaining_tokens() < MIN_USEFUL_TOKENS {
            return true;
        }
        if let Some(limit) = self.config.cost_limit_usd {
            if usage.cost_usd >= limit {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_with(budget: u64, spent: u64, cost: f64) -> DebateUsage {
        let mut usage = DebateUsage::new("db_AAAAAAAAAAAAAAAA", budget);
        if spent > 0 || cost > 0.0 {
            usage.record(TurnUsage {
                turn_id: Uuid::new_v4(),
                provider: ProviderType::Anthropic,
                input_tokens: spent / 2,
                output_tokens: spent - spent / 2,
                cost_usd: cost,
                recorded_at: Utc::now(),
            });
        }
        usage
    }

    #[test]
    fn default_budget_formula_and_clamps() {
        // N=2: 40k + 20k + 20k = 80k, clamped up to 100k.
        assert_eq!(BudgetManager::default_budget(2), 100_000);
        // N=4: 80k + 30k + 20k = 130k.
        assert_eq!(BudgetManager::default_budget(4), 130_000);
        // N=6: 120k + 40k + 20k = 180k.
        assert_eq!(BudgetManager::default_budget(6), 180_000);
        // N=10: 200k + 60k + 20k = 280k, under the 300k cap.
        assert_eq!(BudgetManager::default_budget(10), 280_000);
    }

    #[test]
    fn env_override_wins() {
        let manager = BudgetManager::new(BudgetConfig {
            token_budget_per_debate: Some(42_000),
            ..Default::default()
        });
        assert_eq!(manager.budget_for(10), 42_000);
    }

    #[test]
    fn admits_within_budget() {
        let manager = BudgetManager::new(BudgetConfig::default());
        let usage = usage_with(100_000, 10_000, 0.0);
        let check = manager.check_budget(&usage, ProviderType::Openai, 5_000, 700);
        assert!(check.admitted);
        assert_eq!(check.tokens_remaining, 90_000);
        assert!(check.estimated_cost_usd > 0.0);
        assert_eq!(check.warning_level, WarningLevel::None);
    }

    #[test]
    fn hard_limit_denies_oversized_estimates() {
        let manager = BudgetManager::new(BudgetConfig::default());
        let usage = usage_with(10_000, 9_500, 0.0);
        let check = manager.check_budget(&usage, ProviderType::Openai, 400, 700);
        assert!(!check.admitted);
        assert!(check.reason.unwrap().contains("exceeds"));
    }

    #[test]
    fn soft_limit_admits_oversized_estimates() {
        let manager = BudgetManager::new(BudgetConfig {
            hard_limit: false,
            ..Default::default()
        });
        let usage = usage_with(10_000, 9_500, 0.0);
        let check = manager.check_budget(&usage, ProviderType::Openai, 400, 700);
        assert!(check.admitted);
    }

    #[test]
    fn cost_limit_denies_when_projection_exceeds() {
        let manager = BudgetManager::new(BudgetConfig {
            cost_limit_usd: Some(0.05),
            ..Default::default()
        });
        let usage = usage_with(1_000_000, 0, 0.049);
        // 5k in + 700 out on openai ≈ $0.071.
        let check = manager.check_budget(&usage, ProviderType::Openai, 5_000, 700);
        assert!(!check.admitted);
        assert!(check.reason.unwrap().contains("cost limit"));
    }

    #[test]
    fn warning_levels_escalate() {
        let manager = BudgetManager::new(BudgetConfig::default());
        assert_eq!(
            manager.warning_level(&usage_with(100, 79, 0.0)),
            WarningLevel::None
        );
        assert_eq!(
            manager.warning_level(&usage_with(100, 80, 0.0)),
            WarningLevel::Warning
        );
        assert_eq!(
            manager.warning_level(&usage_with(100, 95, 0.0)),
            WarningLevel::Critical
        );
    }

    #[test]
    fn record_usage_computes_cost_from_the_table() {
        let manager = BudgetManager::new(BudgetConfig::default());
        let mut usage = DebateUsage::new("db_AAAAAAAAAAAAAAAA", 100_000);
        let turn = manager.record_usage(
            &mut usage,
            Uuid::new_v4(),
            ProviderType::Anthropic,
            Usage::new(1_000, 1_000),
        );
        // 1k in at .003 + 1k out at .015.
        assert!((turn.cost_usd - 0.018).abs() < 1e-9);
        assert_eq!(usage.total_tokens, 2_000);
        assert_eq!(usage.turns.len(), 1);
    }

    #[test]
    fn should_end_on_token_exhaustion_or_cost_ceiling() {
        let manager = BudgetManager::new(BudgetConfig::default());
        assert!(manager.should_end_due_to_budget(&usage_with(1_000, 950, 0.0)));
        assert!(!manager.should_end_due_to_budget(&usage_with(1_000, 800, 0.0)));

        let capped = BudgetManager::new(BudgetConfig {
            cost_limit_usd: Some(0.10),
            ..Default::default()
        });
        assert!(capped.should_end_due_to_budget(&usage_with(1_000_000, 0, 0.10)));
        assert!(!capped.should_end_due_to_budget(&usage_with(1_000_000, 0, 0.09)));
    }
}
