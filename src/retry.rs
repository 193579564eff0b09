use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff settings for calls to translation backends
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Preset: translation requests (3 attempts, delays 500ms then 1s)
    pub fn provider_call() -> Self {
        Self::new(3, Duration::from_millis(500)).with_max_delay(Duration::from_secs(4))
    }

    /// Preset: language detection (2 attempts, one 250ms delay)
    ///
    /// Detection sits in front of a translation, so it gives up sooner.
    pub fn detection() -> Self {
        Self::new(2, Duration::from_millis(250)).with_max_delay(Duration::from_secs(1))
    }

    /// Preset: no retries at all. Used by tests and by callers that wrap
    /// their own timeout around the whole chain.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the given attempt (0-indexed); the first attempt never waits.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::provider_call()
    }
}

/// Run `operation` until it succeeds, the attempts run out, or
/// `should_retry` rejects an error.
///
/// Returns the last error when every attempt failed.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: retry attempt {}/{} after {:?}",
                operation_name,
                attempt + 1,
                max_attempts,
                delay
            );
            sleep(delay).await;
        }

        let error = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            debug!("{}: error is not retryable: {}", operation_name, error);
            return Err(error);
        }

        attempt += 1;
        if attempt >= max_attempts {
            warn!(
                "{}: all {} attempts failed, last error: {}",
                operation_name, max_attempts, error
            );
            return Err(error);
        }

        warn!(
            "{}: attempt {}/{} failed ({}), {} retries remaining",
            operation_name,
            attempt,
            max_attempts,
            error,
            max_attempts - attempt
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_is_provider_call() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let config = RetryConfig::new(0, Duration::from_millis(1));
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(4, Duration::from_secs(1));

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_respects_max() {
        let config =
            RetryConfig::new(10, Duration::from_secs(1)).with_max_delay(Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result: Result<u32, &str> = with_retry_if(
            &config,
            "test",
            || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("temporary")
                    } else {
                        Ok(7)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result: Result<u32, String> = with_retry_if(
            &config,
            "test",
            || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {}", n))
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result: Result<u32, &str> = with_retry_if(
            &config,
            "test",
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("client error 400")
                }
            },
            |e: &&str| !e.contains("400"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_never_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let _: Result<(), &str> = with_retry_if(
            &RetryConfig::single_attempt(),
            "test",
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("nope")
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
