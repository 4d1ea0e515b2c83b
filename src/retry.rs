//! Injectable retry policy with exponential backoff and jitter.
//!
//! The controller never hard-codes a retry loop; callers hand it a
//! [`RetryConfig`] and the default makes a single attempt, leaving all
//! retry decisions outside the core. Only failures the caller's predicate
//! classifies as transient are retried; semantic failures short-circuit.
//!
//! # Example
//!
//! ```ignore
//! use trellis::retry::{retry_with_backoff, RetryConfig};
//!
//! let state = retry_with_backoff(
//!     &RetryConfig::with_max_attempts(3),
//!     "describe_cluster",
//!     |e: &Error| e.is_retryable(),
//!     || async { cloud.describe_cluster("demo").await },
//! ).await?;
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Policy for operations that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between attempts
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryConfig {
    /// A single attempt, no retries. What the controller uses unless the
    /// caller injects a policy of its own.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// A policy with the given maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..Self::none()
        }
    }
}

/// Execute an async operation under the given policy.
///
/// Errors the predicate classifies as non-retryable are returned
/// immediately; transient errors are retried with exponential backoff and
/// jitter until the attempt budget is spent.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let budget = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !is_retryable(&error) || attempt >= budget {
            return Err(error);
        }

        let pause = jittered(delay);
        warn!(
            operation = %operation_name,
            attempt,
            error = %error,
            next_attempt_in_ms = pause.as_millis() as u64,
            "transient failure, backing off"
        );
        tokio::time::sleep(pause).await;
        delay = delay
            .mul_f64(config.backoff_multiplier)
            .min(config.max_delay);
    }
}

/// Scale a delay by a random factor in [0.5, 1.5) to spread out retries
fn jittered(base: Duration) -> Duration {
    base.mul_f64(rand::thread_rng().gen_range(0.5..1.5))
}
