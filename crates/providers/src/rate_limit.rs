//! Per-provider token-bucket rate limiting.
//!
//! One bucket per provider, shared across every debate in the process.
//! `wait_for_capacity` reserves an estimated token count (plus one
//! request slot) before a call; `consume_capacity` settles the true
//! count afterwards. Waiters on the same bucket are served
//! first-come-first-served via a FIFO admission mutex, and a cancelled
//! wait never consumes.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use da_domain::error::ProviderType;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Quotas
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Published per-minute quota for one provider. Tunable.
#[derive(Debug, Clone, Copy)]
pub struct ProviderQuota {
    pub tokens_per_minute: u64,
    pub requests_per_minute: u32,
}

/// Vendor-published quotas for the default tiers.
pub fn published_quota(provider: ProviderType) -> ProviderQuota {
    match provider {
        ProviderType::Openai => ProviderQuota {
            tokens_per_minute: 450_000,
            requests_per_minute: 500,
        },
        ProviderType::Anthropic => ProviderQuota {
            tokens_per_minute: 400_000,
            requests_per_minute: 1_000,
        },
        ProviderType::Xai => ProviderQuota {
            tokens_per_minute: 500_000,
            requests_per_minute: 600,
        },
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bucket
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct BucketState {
    quota: ProviderQuota,
    tokens: f64,
    requests: f64,
    last_refill: Instant,
}

impl BucketState {
    fn new(quota: ProviderQuota) -> Self {
        Self {
            quota,
            tokens: quota.tokens_per_minute as f64,
            requests: quota.requests_per_minute as f64,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + elapsed * self.quota.tokens_per_minute as f64 / 60.0)
            .min(self.quota.tokens_per_minute as f64);
        self.requests = (self.requests + elapsed * self.quota.requests_per_minute as f64 / 60.0)
            .min(self.quota.requests_per_minute as f64);
        self.last_refill = now;
    }

    /// Reserve the estimate and one request slot, or report how long to
    /// wait for both to be available.
    fn try_reserve(&mut self, tokens: f64) -> Option<Duration> {
        if self.tokens >= tokens && self.requests >= 1.0 {
            self.tokens -= tokens;
            self.requests -= 1.0;
            return None;
        }

        let token_wait = if self.tokens >= tokens {
            0.0
        } else {
            (tokens - self.tokens) * 60.0 / self.quota.tokens_per_minute as f64
        };
        let request_wait = if self.requests >= 1.0 {
            0.0
        } else {
            (1.0 - self.requests) * 60.0 / self.quota.requests_per_minute as f64
        };
        Some(Duration::from_secs_f64(token_wait.max(request_wait).max(0.01)))
    }
}

struct Bucket {
    /// FIFO admission gate: tokio mutexes queue waiters fairly, which
    /// gives the FCFS ordering guarantee.
    gate: tokio::sync::Mutex<()>,
    state: Mutex<BucketState>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RateLimiter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide rate limiter, one token bucket per provider.
pub struct RateLimiter {
    buckets: HashMap<ProviderType, Bucket>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Limiter with the published quotas for all providers.
    pub fn new() -> Self {
        Self::with_quotas(|p| published_quota(p))
    }

    /// Limiter with custom quotas (tests use tiny buckets).
    pub fn with_quotas(quota_for: impl Fn(ProviderType) -> ProviderQuota) -> Self {
        let buckets = ProviderType::ALL
            .into_iter()
            .map(|p| {
                (
                    p,
                    Bucket {
                        gate: tokio::sync::Mutex::new(()),
                        state: Mutex::new(BucketState::new(quota_for(p))),
                    },
                )
            })
            .collect();
        Self { buckets }
    }

    /// Suspend until the provider's bucket can cover `estimated_tokens`
    /// plus one request slot, then reserve both.
    ///
    /// Cancel-safe: dropping the future before it returns leaves the
    /// bucket untouched (reservation happens synchronously at the
    /// moment of success).
    pub async fn wait_for_capacity(&self, provider: ProviderType, estimated_tokens: u64) {
        let bucket = &self.buckets[&provider];
        let _gate = bucket.gate.lock().await;

        // An estimate beyond the whole bucket could never be satisfied.
        let capacity = bucket.state.lock().quota.tokens_per_minute;
        let estimated = estimated_tokens.min(capacity);

        loop {
            let wait = {
                let mut state = bucket.state.lock();
                state.refill(Instant::now());
                state.try_reserve(estimated as f64)
            };
            match wait {
                None => return,
                Some(delay) => {
                    tracing::debug!(
                        provider = %provider,
                        estimated_tokens,
                        wait_ms = delay.as_millis() as u64,
                        "rate limiter waiting for capacity"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Settle the true consumption after a call: a positive delta
    /// versus the estimate tightens the bucket, a negative one credits
    /// the difference back.
    pub fn consume_capacity(
        &self,
        provider: ProviderType,
        estimated_tokens: u64,
        actual_tokens: u64,
    ) {
        let bucket = &self.buckets[&provider];
        let mut state = bucket.state.lock();
        let delta = actual_tokens as f64 - estimated_tokens as f64;
        let cap = state.quota.tokens_per_minute as f64;
        state.tokens = (state.tokens - delta).min(cap);
    }
}
