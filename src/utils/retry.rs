use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::utils::error::{AppError, Result};

/// Default trigger: every failed attempt earns another one.
pub fn any_error(_: &AppError) -> bool {
    true
}

/// Fixed-backoff retry policy shared by every page fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    trigger: fn(&AppError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            trigger: any_error,
        }
    }

    /// Replace the predicate deciding which errors earn another attempt.
    pub fn with_trigger(mut self, trigger: fn(&AppError) -> bool) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn should_retry(&self, error: &AppError) -> bool {
        (self.trigger)(error)
    }

    /// Delays slept between attempts; one fewer than the attempt count.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.delay).take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds, the trigger rejects an error, or
    /// attempts run out. The last error is returned in the latter two cases.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 0u32;

        RetryIf::start(self.strategy(), operation, |error: &AppError| {
            attempt += 1;
            let retry = self.should_retry(error);
            if retry && attempt < max_attempts {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    error,
                    self.delay
                );
            } else {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}",
                    label,
                    attempt,
                    max_attempts,
                    error
                );
            }
            retry
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}
