use crate::error::LedgerError;
use std::future::Future;
use std::time::Duration;

/// Errors that can signal an optimistic-concurrency conflict.
///
/// Implementing this lets higher-level error enums flow through
/// `with_conflict_retry` unchanged while only stale-stamp failures trigger
/// another attempt.
pub trait ConflictError {
    fn is_conflict(&self) -> bool;
}

impl ConflictError for LedgerError {
    fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::VersionConflict { .. })
    }
}

/// Bounded retry for compare-and-swap write units.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before the conflict is surfaced to the caller.
    pub max_attempts: u32,
    /// First backoff delay; doubles on each further attempt.
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-conflict error, or
/// exhausts the policy's attempts.
///
/// Each attempt must be a complete read-validate-write unit: the closure is
/// re-invoked from scratch, so stale snapshots from a lost race are re-read
/// rather than replayed. The backoff between attempts doubles from
/// `base_backoff`. No state is held across attempts.
pub async fn with_conflict_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    E: ConflictError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_conflict() && attempt < policy.max_attempts => {
                let backoff = policy.base_backoff * (1u32 << (attempt - 1));
                tracing::debug!(attempt, ?backoff, "version conflict, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn conflict() -> LedgerError {
        LedgerError::VersionConflict {
            entity: "holding",
            key: "test".to_string(),
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_transient_conflicts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<u32, LedgerError> =
            with_conflict_retry(&quick_policy(3), move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(conflict())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_surface_the_conflict() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), LedgerError> =
            with_conflict_retry(&quick_policy(3), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(conflict())
                }
            })
            .await;

        assert!(matches!(result, Err(LedgerError::VersionConflict { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_conflict_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), LedgerError> =
            with_conflict_retry(&quick_policy(3), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(LedgerError::NotFound {
                        entity: "order",
                        key: "missing".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
