//! Retry logic utilities for RPC operations
//!
//! Exponential backoff for transient node failures, plus the timeout
//! wrapper the CLI uses to bound a whole conformance run.

use crate::config::BitcoinRpcConfig;
use crate::errors::{AdapterError, AdapterResult};
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Calculate next backoff duration using exponential backoff with a maximum cap
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use node_conformance::rpc::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

/// How often and how patiently a failing call is repeated
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
}

impl From<&BitcoinRpcConfig> for RetryPolicy {
    fn from(config: &BitcoinRpcConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_backoff_seconds: config.max_backoff_seconds,
        }
    }
}

/// Only transport-level failures are worth repeating; answers such as
/// "block not found" are final
fn is_retryable(err: &AdapterError) -> bool {
    matches!(
        err,
        AdapterError::CallFailed { .. } | AdapterError::ConnectionFailed(_)
    )
}

/// Run a blocking call, retrying transient failures with exponential backoff
pub fn call_with_retry<T, F>(policy: &RetryPolicy, operation: &str, mut call: F) -> AdapterResult<T>
where
    F: FnMut() -> AdapterResult<T>,
{
    let mut attempts = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        match call() {
            Ok(value) => {
                if attempts > 0 {
                    debug!("{} succeeded after {} attempts", operation, attempts + 1);
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) => {
                attempts += 1;
                if attempts >= policy.max_retries {
                    error!("{} failed after {} attempts: {}", operation, attempts, e);
                    return Err(AdapterError::MaxRetriesExceeded {
                        operation: operation.to_string(),
                    });
                }

                warn!(
                    "RPC attempt {} failed for {}, retrying in {:?}: {}",
                    attempts, operation, backoff, e
                );
                std::thread::sleep(backoff);
                backoff = calculate_next_backoff(
                    backoff,
                    policy.backoff_multiplier,
                    policy.max_backoff_seconds,
                );
            }
        }
    }
}

/// Execute a blocking operation on the blocking pool under a timeout
///
/// # Returns
/// `Result<Result<T, JoinError>, Elapsed>`
/// - Outer Result: Timeout result (Err = timeout elapsed)
/// - Inner Result: spawn_blocking result (Err = task panic/failure)
pub async fn execute_with_timeout<T, F>(
    timeout_seconds: u64,
    operation: F,
) -> Result<Result<T, JoinError>, Elapsed>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    timeout(
        Duration::from_secs(timeout_seconds),
        tokio::task::spawn_blocking(operation),
    )
    .await
}
