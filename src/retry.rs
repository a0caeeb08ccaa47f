//! Reconnect with exponential backoff.
//!
//! Camera links (Wi-Fi especially) fail transiently. Hosts dial through
//! [`connect_with_retry`], which bounds each attempt with a timeout and backs
//! off between attempts according to a [`RetryPolicy`].

use crate::backend::CameraBackend;
use crate::config::RetryConfig;
use crate::error::{CameraError, CameraResult};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// Defines a policy for retrying a connection.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// The maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth factor applied after every failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier.max(1.0),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after `failures` consecutive failed attempts (1-based).
    pub fn backoff_after(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }
}

/// Connect `camera` to `identifier`, retrying per `policy`.
///
/// Each attempt is bounded by `attempt_timeout`; a timed-out attempt is
/// cleaned up with `disconnect` before the next one. Returns the number of
/// attempts used on success.
pub async fn connect_with_retry(
    camera: &dyn CameraBackend,
    identifier: &str,
    policy: &RetryPolicy,
    attempt_timeout: Duration,
) -> CameraResult<u32> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match timeout(attempt_timeout, camera.connect(identifier)).await {
            Ok(true) => {
                info!(
                    driver = camera.driver_name(),
                    identifier,
                    attempt,
                    "Camera connected"
                );
                return Ok(attempt);
            }
            Ok(false) => {
                warn!(
                    driver = camera.driver_name(),
                    identifier,
                    attempt,
                    max_attempts = attempts,
                    "Connect attempt failed"
                );
            }
            Err(_) => {
                warn!(
                    driver = camera.driver_name(),
                    identifier,
                    attempt,
                    max_attempts = attempts,
                    timeout_ms = attempt_timeout.as_millis() as u64,
                    "Connect attempt timed out"
                );
                camera.disconnect().await;
            }
        }

        if attempt < attempts {
            sleep(policy.backoff_after(attempt)).await;
        }
    }

    Err(CameraError::RetriesExhausted {
        identifier: identifier.to_string(),
        attempts,
    })
}
