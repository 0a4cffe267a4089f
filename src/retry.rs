//! Bounded retry with exponential backoff for database calls.
use crate::config::RetryConfig;
use crate::core::Result;
use std::thread;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::warn;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_ms: u64,
    factor: u64,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_ms: config.base_ms,
            factor: config.factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_ms: 0,
            factor: 1,
            max_delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The sleeps between attempts: one fewer than `max_attempts`, growing
    /// exponentially and never above `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.base_ms)
            .factor(self.factor) // Scale every delay
            .max_delay(self.max_delay) // Maximum delay
            .take(self.max_attempts - 1) // Initial attempt is not preceded by a delay
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only errors whose `is_transient()` is true are retried. The last error is returned.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut delays = self.delays();
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            "attempt {}/{} failed: {}. Retrying in {:?}",
                            attempt, self.max_attempts, e, delay
                        );
                        thread::sleep(delay);
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}
