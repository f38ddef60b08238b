use crate::error::{ClassChatError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay; the n-th retry waits `base * 2^n`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay issued after the zero-indexed `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// A transient failure that will be retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryNotice {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: ClassChatError,
}

impl RetryNotice {
    pub fn describe(&self) -> String {
        format!(
            "Save attempt {}/{} failed, retrying in {:.1}s: {}",
            self.attempt,
            self.max_attempts,
            self.delay.as_secs_f32(),
            self.error
        )
    }
}

/// Retry wrapper for remote writes.
///
/// Makes no assumption about idempotence: only wrap writes that are safe to
/// repeat, such as a cell overwrite.
#[derive(Clone)]
pub struct RetryingPersistence {
    policy: RetryPolicy,
    backoff: Arc<dyn Backoff>,
}

impl std::fmt::Debug for RetryingPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingPersistence")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for RetryingPersistence {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryingPersistence {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_backoff(policy, Arc::new(TokioBackoff))
    }

    pub fn with_backoff(policy: RetryPolicy, backoff: Arc<dyn Backoff>) -> Self {
        Self { policy, backoff }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds or `max_attempts` attempts failed.
    ///
    /// Every failure except the last is passed to `on_retry` and logged as a
    /// warning; the last one is returned as [`ClassChatError::Persistence`].
    pub async fn persist_with_retry<T, F, Fut, N>(&self, mut operation: F, mut on_retry: N) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        N: FnMut(&RetryNotice),
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt + 1 >= max_attempts => {
                    tracing::error!(attempts = max_attempts, %error, "remote write failed for good");
                    return Err(ClassChatError::Persistence {
                        attempts: max_attempts,
                        message: error.to_string(),
                    });
                }
                Err(error) => {
                    let delay = self.policy.delay_after(attempt);
                    let notice = RetryNotice {
                        attempt: attempt + 1,
                        max_attempts,
                        delay,
                        error,
                    };
                    tracing::warn!(
                        attempt = notice.attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %notice.error,
                        "remote write failed, backing off"
                    );
                    on_retry(&notice);
                    self.backoff.wait(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
