//! Retry logic with exponential backoff and jitter.
//!
//! Only rate-limit responses are retried; the retry policy can supply a
//! server-provided delay (`Retry-After`) that overrides the backoff.

use crate::config::NetworkConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: NetworkConfig::MAX_RETRIES,
            base_delay: NetworkConfig::RETRY_BASE_DELAY,
            max_delay: NetworkConfig::RETRY_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the backoff delay for a given attempt number (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = 2f64.powi(attempt.min(16) as i32);
        let capped_secs = (self.base_delay.as_secs_f64() * multiplier)
            .min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Factor in 0.5..1.5 keeps the mean delay and avoids near-zero waits.
            let jitter_factor = rand::rng().random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and return the error.
    Stop,
    /// Try again, after the given delay or the computed backoff.
    Retry(Option<Duration>),
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Last error message if any attempt failed.
    pub last_error: Option<String>,
}

/// Retry an async operation according to `policy`.
///
/// Returns the final result together with the statistics of the run.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    policy: impl Fn(&E) -> RetryDecision,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Request succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };
        stats.last_error = Some(err.to_string());

        let hint = match policy(&err) {
            RetryDecision::Stop => return (Err(err), stats),
            RetryDecision::Retry(hint) => hint,
        };

        if attempt + 1 >= config.max_attempts {
            warn!(
                "All {} attempts exhausted. Last error: {}",
                config.max_attempts, err
            );
            return (Err(err), stats);
        }

        let delay = hint
            .map(|d| d.min(config.max_delay))
            .unwrap_or_else(|| config.calculate_delay(attempt));
        stats.total_delay += delay;

        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            config.max_attempts,
            err,
            delay
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
