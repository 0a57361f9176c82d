//! Retry policy: bounded attempts with backoff, shared by mention fetches and
//! media downloads.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::duration_secs;
use crate::error::CapbotError;

/// Retry policy for transient failures.
///
/// `max_attempts` counts every attempt including the first one, so an
/// operation that fails `k` times succeeds under this policy iff
/// `k < max_attempts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(with = "duration_secs")]
    pub initial_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    #[serde(with = "duration_secs")]
    pub max_delay: Duration,

    /// Stretch each delay by a random 0-100%.
    pub jitter: bool,
}

impl RetryPolicy {
    /// No delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Exponential backoff starting at one second.
    pub fn backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }

    /// Delay to wait after `attempts` failed attempts (1-indexed), before jitter.
    ///
    /// delay = initial_delay * multiplier^(attempts - 1), capped at max_delay.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // cap before converting: the uncapped value overflows Duration after ~64 doublings
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Start-up check; `field` names the config entry in the error.
    pub fn validate(&self, field: &str) -> Result<(), CapbotError> {
        if self.max_attempts == 0 {
            return Err(CapbotError::Config(format!(
                "{field}.max_attempts must be at least 1"
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CapbotError::Config(format!(
                "{field}.multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if self.max_delay < self.initial_delay {
            return Err(CapbotError::Config(format!(
                "{field}.max_delay must not be shorter than initial_delay"
            )));
        }
        Ok(())
    }

    /// Run `operation` until it succeeds, fails non-transiently, or the attempt
    /// budget is spent. Returns the last error on exhaustion.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, CapbotError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CapbotError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(label, attempts = attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.jittered(self.next_delay(attempt));
                    tracing::warn!(
                        label,
                        error = %err,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::error!(label, error = %err, attempts = attempt, "retry budget exhausted");
                    } else {
                        tracing::error!(label, error = %err, "non-retryable failure");
                    }
                    return Err(err);
                }
            }
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + factor)).unwrap_or(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32, CapbotError>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(CapbotError::Api(format!("flake {n}"))))
            } else {
                std::future::ready(Ok(n))
            }
        }
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: false,
        };
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
        assert_eq!(policy.next_delay(4), Duration::from_secs(10));
    }

    #[test]
    fn late_attempts_stay_at_the_cap() {
        let policy = RetryPolicy::backoff(100);
        assert_eq!(policy.next_delay(70), Duration::from_secs(30));
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn validate_accepts_stock_policies() {
        assert!(RetryPolicy::backoff(10).validate("fetch_retry").is_ok());
        assert!(RetryPolicy::immediate(1).validate("fetch_retry").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn long_budget_runs_to_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = RetryPolicy::backoff(80).run("test", flaky(u32::MAX, calls.clone())).await;
        assert!(matches!(result, Err(CapbotError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 80);
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(5);
        assert_eq!(policy.next_delay(1), Duration::ZERO);
        assert_eq!(policy.next_delay(4), Duration::ZERO);
    }

    #[tokio::test]
    async fn succeeds_when_failures_below_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = RetryPolicy::immediate(3)
            .run("test", flaky(2, calls.clone()))
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_when_failures_reach_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = RetryPolicy::immediate(3)
            .run("test", flaky(3, calls.clone()))
            .await;
        assert!(matches!(result, Err(CapbotError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .run("test", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(CapbotError::Malformed("bad".into())))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(1),
            jitter: false,
        };
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let _ = policy.run("test", flaky(2, calls)).await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
