//! Retry policy for fetch failures.

use std::future::Future;
use std::time::Duration;

use hh_client::HhError;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    Retry(Duration),
    /// Stop retrying; the caller skips the unit of work.
    GiveUp,
    /// Stop the whole run.
    Abort,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Floor for the delay after a 429.
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(30),
            rate_limit_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting. For tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Decide after `attempt` (1-based) failed with `err`.
    pub fn decide(&self, err: &HhError, attempt: u32) -> RetryDecision {
        match err {
            HhError::AuthFailed { .. } => RetryDecision::Abort,
            _ if attempt >= self.max_attempts => RetryDecision::GiveUp,
            HhError::RateLimited { retry_after } => {
                let hinted = retry_after.unwrap_or(Duration::ZERO);
                RetryDecision::Retry(hinted.max(self.rate_limit_backoff))
            }
            HhError::TransientNetwork(_) => RetryDecision::Retry(self.backoff(attempt)),
            _ => RetryDecision::GiveUp,
        }
    }

    /// Run `op` until it succeeds or the policy stops retrying.
    ///
    /// `retries` is bumped once per repeated attempt. The error of the last
    /// attempt is returned as-is; callers check for `AuthFailed` themselves.
    pub async fn run<T, F, Fut>(&self, mut op: F, retries: &mut u64) -> hh_client::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = hh_client::Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.decide(&err, attempt) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    *retries += 1;
                    attempt += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::GiveUp | RetryDecision::Abort => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            rate_limit_backoff: Duration::from_secs(8),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_decisions() {
        let policy = RetryPolicy::default();
        let auth = HhError::AuthFailed {
            status: 401,
            message: String::new(),
        };
        assert_eq!(policy.decide(&auth, 1), RetryDecision::Abort);

        let limited = HhError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(
            policy.decide(&limited, 1),
            RetryDecision::Retry(Duration::from_secs(8))
        );
        let limited_long = HhError::RateLimited {
            retry_after: Some(Duration::from_secs(20)),
        };
        assert_eq!(
            policy.decide(&limited_long, 2),
            RetryDecision::Retry(Duration::from_secs(20))
        );
        assert_eq!(policy.decide(&limited, 3), RetryDecision::GiveUp);

        let transient = HhError::TransientNetwork("reset".into());
        assert_eq!(
            policy.decide(&transient, 2),
            RetryDecision::Retry(Duration::from_secs(2))
        );

        let malformed = HhError::MalformedResponse("eof".into());
        assert_eq!(policy.decide(&malformed, 1), RetryDecision::GiveUp);
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let mut retries = 0;
        let value = RetryPolicy::immediate(3)
            .run(
                move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(HhError::TransientNetwork("reset".into()))
                    } else {
                        Ok(7)
                    }
                },
                &mut retries,
            )
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let mut retries = 0;
        let err = RetryPolicy::immediate(2)
            .run(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(HhError::RateLimited { retry_after: None })
                },
                &mut retries,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HhError::RateLimited { .. }));
        assert_eq!(retries, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
