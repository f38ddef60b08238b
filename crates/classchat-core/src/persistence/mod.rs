//! Retry-wrapped persistence for remote writes.

mod retry;

pub use retry::{
    Backoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryNotice, RetryPolicy,
    RetryingPersistence, TokioBackoff,
};
