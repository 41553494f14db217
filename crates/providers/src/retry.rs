//! Retry wrapper with exponential backoff and jitter.
//!
//! Wraps any fallible async operation; only normalized provider errors
//! marked retryable (or whose kind is in the policy's retryable set)
//! are retried. Vendor-supplied `retry-after` delays are honored
//! verbatim, capped at the policy maximum.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;

use da_domain::error::{Error, ProviderError, ProviderErrorKind, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Jitter applied around each computed backoff delay.
const JITTER_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; total attempts = this + 1.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub retryable_kinds: HashSet<ProviderErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            retryable_kinds: [
                ProviderErrorKind::RateLimit,
                ProviderErrorKind::ServerError,
                ProviderErrorKind::NetworkError,
                ProviderErrorKind::Timeout,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl RetryPolicy {
    /// Whether the policy retries this error at all.
    pub fn should_retry(&self, err: &Error) -> bool {
        match err {
            Error::Provider(p) => p.retryable || self.retryable_kinds.contains(&p.kind),
            _ => false,
        }
    }

    /// Backoff delay before retrying after `attempt` (0-based) failed.
    ///
    /// A vendor retry-after wins over the exponential schedule; both
    /// are capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, err: &ProviderError) -> Duration {
        if let Some(ms) = err.retry_after_ms {
            return Duration::from_millis(ms).min(self.max_delay);
        }

        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        let jitter = capped * JITTER_FRACTION;
        let delayed = rand::thread_rng().gen_range((capped - jitter)..=(capped + jitter));
        Duration::from_millis(delayed.max(0.0) as u64).min(self.max_delay)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wrapper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run `op` with retries under `policy`.
///
/// The closure receives the 0-based attempt number and produces a fresh
/// future each time; exhaustion surfaces the last error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !policy.should_retry(&err) {
                    return Err(err);
                }
                let delay = match &err {
                    Error::Provider(p) => policy.delay_for(attempt, p),
                    _ => policy.initial_delay,
                };
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retryable provider failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_domain::error::ProviderType;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> Error {
        ProviderError::new(
            ProviderType::Openai,
            ProviderErrorKind::RateLimit,
            "too fast",
        )
        .into()
    }

    fn auth_failed() -> Error {
        ProviderError::new(ProviderType::Openai, ProviderErrorKind::AuthError, "nope").into()
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = with_retry(&policy, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let calls = AtomicU32::new(0);

        let err = with_retry::<(), _, _>(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3); // initial + 2 retries
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn non_retryable_errors_propagate_immediately() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let err = with_retry::<(), _, _>(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(auth_failed()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, Error::Provider(p) if p.kind == ProviderErrorKind::AuthError));
    }

    #[test]
    fn delay_grows_exponentially_within_jitter() {
        let policy = RetryPolicy::default();
        let err = ProviderError::new(
            ProviderType::Openai,
            ProviderErrorKind::ServerError,
            "boom",
        );

        for attempt in 0..4 {
            let expected = 500.0 * 2.0f64.powi(attempt as i32);
            let delay = policy.delay_for(attempt, &err).as_millis() as f64;
            assert!(delay >= expected * (1.0 - JITTER_FRACTION) - 1.0);
            assert!(delay <= expected * (1.0 + JITTER_FRACTION) + 1.0);
        }
    }

    #[test]
    fn retry_after_wins_and_is_capped() {
        let policy = RetryPolicy::default();

        let hinted = ProviderError::new(
            ProviderType::Openai,
            ProviderErrorKind::RateLimit,
            "slow down",
        )
        .with_retry_after_ms(1_234);
        assert_eq!(
            policy.delay_for(0, &hinted),
            Duration::from_millis(1_234)
        );

        let huge = ProviderError::new(
            ProviderType::Openai,
            ProviderErrorKind::RateLimit,
            "slow down",
        )
        .with_retry_after_ms(120_000);
        assert_eq!(policy.delay_for(0, &huge), policy.max_delay);
    }

    #[test]
    fn kind_in_retryable_set_overrides_flag() {
        let mut policy = RetryPolicy::default();
        policy
            .retryable_kinds
            .insert(ProviderErrorKind::ContextLength);

        let mut err = ProviderError::new(
            ProviderType::Openai,
            ProviderErrorKind::ContextLength,
            "too long",
        );
        err.retryable = false;
        assert!(policy.should_retry(&err.into()));
    }
}
