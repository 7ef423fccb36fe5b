//! Retry logic with backoff for resilient network operations.
//!
//! Two policies are used during a migration: a short fixed backoff for
//! per-object inserts and a longer escalating backoff for batch fetches.
//! Both are bounded by `max_attempts` and retry every failure unless
//! `fail_fast` is set.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    /// Upper bound for the delay between retries.
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry (1.0 = fixed backoff).
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    /// Whether to add jitter to the delay.
    #[serde(default)]
    pub add_jitter: bool,
    /// Give up at once on errors [`is_retryable_error`] deems permanent
    /// (4xx other than 429, decode failures).
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::for_inserts()
    }
}

impl RetryConfig {
    /// Per-object insert policy: 3 attempts, fixed 2 second backoff.
    pub fn for_inserts() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 1.0,
            add_jitter: false,
            fail_fast: false,
        }
    }

    /// Batch fetch policy: 6 attempts starting at 5 seconds, doubling up to a minute.
    pub fn for_batch_fetch() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: false,
            fail_fast: false,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            fail_fast: false,
        }
    }

    /// Calculates the delay before a given retry (1-based; 0 means the first attempt).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);

        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            // Up to 25% jitter
            capped_delay + capped_delay * 0.25 * rand_jitter()
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Whether `error` may be retried under this policy.
    pub fn should_retry(&self, error: &Error) -> bool {
        !self.fail_fast || is_retryable_error(error)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0) without external dependencies.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

/// Determines if an error is transient.
///
/// Transport failures, rate limits and 5xx responses are transient. Other
/// 4xx responses usually mean the request itself is wrong. Only consulted
/// by policies with `fail_fast` set.
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RateLimit(_) | Error::Io(_) => true,
        Error::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        Error::Status { status, .. } => *status == 429 || *status >= 500,
        Error::GraphQl(msg) => {
            let msg = msg.to_lowercase();
            msg.contains("timeout") || msg.contains("temporar") || msg.contains("unavailable")
        }
        _ => false,
    }
}

/// Executes an async operation with retry logic.
///
/// Returns the first success, the last error once `max_attempts` is
/// exhausted, or (with `fail_fast`) the first permanent error.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            debug!(
                "{}: retry {}/{} after {:?}",
                operation_name,
                attempt,
                max_attempts - 1,
                delay
            );
            sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{}: succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if config.should_retry(&e) && attempt + 1 < max_attempts => {
                warn!(
                    "{}: {} (attempt {}/{}), retrying",
                    operation_name,
                    e,
                    attempt + 1,
                    max_attempts
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
