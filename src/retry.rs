use crate::error::DispatchError;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(5), // Default values - overridden by TOML config in production
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable: Display {
    fn is_transient(&self) -> bool;
}

impl Retryable for DispatchError {
    fn is_transient(&self) -> bool {
        DispatchError::is_transient(self)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: Display> {
    #[error("{operation} failed after {attempts} attempts. Last error: {error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        error: E,
    },

    #[error("{operation} aborted on attempt {attempt}: {error}")]
    Aborted {
        operation: String,
        attempt: u32,
        error: E,
    },
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// `max_attempts` attempts have been made. The delay between attempts is fixed.
pub async fn execute_with_retry<F, Fut, T, E>(
    operation: F,
    retry_config: &RetryConfig,
    operation_name: &str,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable,
{
    let max_attempts = retry_config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        info!("🔄 {} attempt {}/{}", operation_name, attempt, max_attempts);

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("✅ {} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if !e.is_transient() => {
                warn!("❌ {} failed on attempt {} (not retryable): {}", operation_name, attempt, e);
                return Err(RetryError::Aborted {
                    operation: operation_name.to_string(),
                    attempt,
                    error: e,
                });
            }
            Err(e) => {
                warn!("❌ {} failed on attempt {}: {}", operation_name, attempt, e);

                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                        error: e,
                    });
                }

                info!("⏳ Waiting {:?} before retry...", retry_config.delay);
                sleep(retry_config.delay).await;
            }
        }

        attempt += 1;
    }
}
