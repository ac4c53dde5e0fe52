use crate::utils::error::{MigrationError, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// 固定次數、固定間隔的重試策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Exactly one attempt, no delay.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: MigrationError },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Runs `op` until it succeeds or the policy runs out of attempts, sleeping
/// `policy.delay` between attempts. `on_failure` sees every failed attempt
/// together with whether another attempt follows.
pub async fn submit_with_retry<T, F, Fut, H>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_failure: H,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    H: FnMut(u32, &MigrationError, bool),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) => {
                let will_retry = attempt < max_attempts;
                tracing::debug!(
                    "Attempt {}/{} failed: {} (retry: {})",
                    attempt,
                    max_attempts,
                    e,
                    will_retry
                );
                on_failure(attempt, &e, will_retry);

                if !will_retry {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    };
                }

                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
        }
    }
}

/// 單次嘗試：失敗直接傳回錯誤
pub async fn submit_once<T, F, Fut>(op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    submit_with_retry(&RetryPolicy::single_attempt(), op, |_, _, _| {})
        .await
        .into_result()
}
