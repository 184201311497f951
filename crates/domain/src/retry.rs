//! Re-running operations that lost an optimistic-concurrency race.

use std::future::Future;

use tracing::{debug, warn};

use crate::Result;

/// Runs `operation`, re-running it while it fails with a concurrency
/// conflict, at most `max_retries` extra times.
///
/// Every attempt must start from a fresh read; the closure is called again
/// from scratch. Errors other than conflicts are returned immediately.
pub async fn with_conflict_retry<F, Fut, T>(
    operation_name: &'static str,
    max_retries: u32,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_conflict() && attempt <= max_retries => {
                metrics::counter!("store_conflict_retries_total", "operation" => operation_name)
                    .increment(1);
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "concurrency conflict, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use common::Version;
    use store::StoreError;
    use uuid::Uuid;

    use super::*;
    use crate::DomainError;

    fn conflict() -> DomainError {
        StoreError::ConcurrencyConflict {
            record_type: "WorkOrder",
            id: Uuid::new_v4(),
            expected: Version::first(),
            actual: Some(Version::new(2)),
        }
        .into()
    }

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_conflict_retry("test", 3, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_conflict_retry("test", 2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_conflict_retry("test", 5, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::validation("nope"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
