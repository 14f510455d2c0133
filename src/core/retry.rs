//! Exponential backoff for one-shot requests.
//!
//! Refresh sessions never retry on their own (the next tick is the retry);
//! this is for callers that need a single answer, such as `status`.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
const BACKOFF_FACTOR: u32 = 2;

#[derive(Debug, Clone)]
pub struct RetryState {
    base_delay: Duration,
    max_delay: Duration,
    consecutive_failures: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::with_delays(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    pub fn with_delays(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            consecutive_failures: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Delay before the next attempt: zero until the first failure, then
    /// `base * 2^(failures - 1)` capped at the maximum.
    pub fn current_delay(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let factor = BACKOFF_FACTOR.saturating_pow(self.consecutive_failures - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_in_backoff(&self) -> bool {
        self.consecutive_failures > 0
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `operation` up to `max_attempts` times, sleeping with exponential
/// backoff between failures. Returns the last error when every attempt fails.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    mut state: RetryState,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);

    loop {
        match operation().await {
            Ok(value) => {
                if state.is_in_backoff() {
                    tracing::info!(
                        failures = state.consecutive_failures(),
                        "Request recovered after retrying"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                state.record_failure();
                if state.consecutive_failures() >= max_attempts {
                    return Err(e);
                }

                let delay = state.current_delay();
                tracing::warn!(
                    error = %e,
                    attempt = state.consecutive_failures(),
                    next_retry_ms = delay.as_millis() as u64,
                    "Request failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
