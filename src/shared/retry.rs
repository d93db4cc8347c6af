//! Retry with exponential backoff
//!
//! Used by the allocation coordinator for operations that can lose a race
//! against a concurrent worker (hold creation, device binding) and come back
//! with a retryable conflict.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Maximum delay between retries (cap).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Profile for transaction conflicts: short initial delay, a few
    /// attempts. Lock windows on the ledgers are tiny, so waiting long
    /// between attempts only holds the caller up.
    pub fn for_conflicts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Execute an async operation with exponential backoff retry.
///
/// `should_retry` decides whether a given error is worth another attempt
/// (conflict against fresh state) or permanent (bail immediately).
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt == config.max_attempts || !should_retry(&err) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = config.max_attempts,
                        error = %err,
                        "Operation failed permanently"
                    );
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Conflict, retrying"
                );

                tokio::time::sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }

    unreachable!("Loop exits via return")
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            RetryConfig {
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::for_conflicts(3)
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("conflict".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
            "test_op",
        )
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn bails_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            RetryConfig::for_conflicts(5),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent".to_string()) }
            },
            |_| false,
            "test_op",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            RetryConfig {
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::for_conflicts(3)
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("conflict".to_string()) }
            },
            |_| true,
            "test_op",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
