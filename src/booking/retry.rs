//! Bounded retry around a single provider data request.
//!
//! A 403 from the provider is the expected "you look like a bot" answer and is
//! handled like any other failed attempt: linear backoff, then try again. Only
//! when the attempt budget is spent does the caller see an error.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ScrapeError;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptError {
    /// Provider answered 403
    #[error("blocked by provider (HTTP 403)")]
    Blocked,
    /// Network error, bad status, unparsable body
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff after the n-th failure is `n * backoff_step`
    pub backoff_step: Duration,
    /// Inclusive bounds of the random pre-request delay
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
            jitter_min: Duration::from_millis(200),
            jitter_max: Duration::from_millis(700),
        }
    }
}

impl RetryPolicy {
    /// Random pre-request delay, drawn fresh for every attempt.
    pub fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if max <= min {
            return self.jitter_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        self.backoff_step
            .checked_mul(failed_attempt)
            .unwrap_or(Duration::MAX)
    }

    /// Run `attempt` until it succeeds or `max_attempts` have been made.
    ///
    /// `attempt` is called with the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, provider: &'static str, mut attempt: F) -> Result<T, ScrapeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut made = 0u32;

        loop {
            tokio::time::sleep(self.jitter()).await;
            made += 1;

            let err = match attempt(made).await {
                Ok(value) => {
                    if made > 1 {
                        debug!("[{}] succeeded on attempt {}", provider, made);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if made >= max_attempts {
                warn!(
                    "[{}] giving up after {} attempt(s): {}",
                    provider, made, err
                );
                return Err(ScrapeError::ProviderFetchFailed {
                    provider,
                    attempts: made,
                    last_error: err.to_string(),
                });
            }

            let delay = self.backoff(made);
            match err {
                AttemptError::Blocked => warn!(
                    "[{}] blocked on attempt {}/{}, backing off {:?}",
                    provider, made, max_attempts, delay
                ),
                AttemptError::Failed(ref reason) => warn!(
                    "[{}] attempt {}/{} failed ({}), backing off {:?}",
                    provider, made, max_attempts, reason, delay
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let out = fast_policy()
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, AttemptError>(7) }
            })
            .await
            .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blocked_then_ok_is_transparent() {
        let out = fast_policy()
            .run("test", |n| async move {
                if n == 1 {
                    Err(AttemptError::Blocked)
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 2);
    }

    #[tokio::test]
    async fn test_blocked_every_time_reports_three_attempts() {
        let err = fast_policy()
            .run("test", |_| async { Err::<(), _>(AttemptError::Blocked) })
            .await
            .unwrap_err();
        match err {
            ScrapeError::ProviderFetchFailed {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("403"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_failures_consume_attempts_and_keep_last_error() {
        let calls = AtomicU32::new(0);
        let err = fast_policy()
            .run("test", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(AttemptError::Failed(format!("boom {n}"))) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(
            matches!(err, ScrapeError::ProviderFetchFailed { ref last_error, .. } if last_error == "boom 3")
        );
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            backoff_step: Duration::from_millis(u64::MAX),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_attempt_error_messages() {
        assert_eq!(AttemptError::Blocked.to_string(), "blocked by provider (HTTP 403)");
        assert_eq!(AttemptError::Failed("HTTP 500".into()).to_string(), "HTTP 500");
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let j = policy.jitter();
            assert!(j >= Duration::from_millis(200) && j <= Duration::from_millis(700));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy {
            backoff_step: Duration::from_secs(2),
            ..fast_policy()
        };
        let start = tokio::time::Instant::now();
        let _ = policy
            .run("test", |_| async { Err::<(), _>(AttemptError::Blocked) })
            .await;
        // 1*2s after the first failure, 2*2s after the second, none after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_precedes_every_attempt() {
        let policy = RetryPolicy {
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(500),
            ..fast_policy()
        };

        // One attempt that succeeds still waits once
        let start = tokio::time::Instant::now();
        policy
            .run("test", |_| async { Ok::<_, AttemptError>(()) })
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600));

        // Three failed attempts wait three times
        let start = tokio::time::Instant::now();
        let _ = policy
            .run("test", |_| async { Err::<(), _>(AttemptError::Blocked) })
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1600));
    }
}
