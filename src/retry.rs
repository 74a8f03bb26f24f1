//! The retry controller (§4.6): invoke an async step, decide whether to retry based on
//! its result, back off, repeat. Expressed directly over futures rather than the
//! abstract "zero-argument function returning a result channel" — `invoke_with_retry`
//! itself returns the one-shot-backed future the rest of the engine awaits.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::error::Anomaly;

/// `true` when `result` should be retried. The default: busy/interrupted/unavailable
/// anomalies, matching `Anomaly::is_retriable_default`.
pub type RetryPredicate = dyn Fn(&Result<(), Anomaly>) -> bool + Send + Sync;

/// Milliseconds to wait before the next attempt, or `None` to stop retrying.
pub type BackoffFn = dyn Fn(u32) -> Option<u64> + Send + Sync;

pub fn default_retriable<T>(result: &Result<T, Anomaly>) -> bool {
    matches!(result, Err(e) if e.is_retriable_default())
}

/// Capped exponential backoff: `min(20_000, 100 * 2^attempts)` for `attempts < 3`, then
/// gives up.
pub fn default_backoff(attempts: u32) -> Option<u64> {
    if attempts < 3 {
        Some((100u64 * 2u64.pow(attempts)).min(20_000))
    } else {
        None
    }
}

/// Runs `step` (a factory for the async operation, since it may need to run more than
/// once) until it succeeds, a non-retriable result is reached, or `backoff` gives up.
pub async fn invoke_with_retry<T, F, Fut>(
    mut step: F,
    retriable: &(impl Fn(&Result<T, Anomaly>) -> bool + Sync),
    backoff: &(impl Fn(u32) -> Option<u64> + Sync),
) -> Result<T, Anomaly>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Anomaly>>,
{
    let mut attempts: u32 = 0;
    loop {
        let result = step().await;
        if !retriable(&result) {
            return result;
        }

        match backoff(attempts) {
            Some(delay_ms) => {
                debug!("retrying after anomaly (attempt {}), backing off {}ms", attempts, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempts += 1;
            }
            None => {
                warn!("giving up after {} attempts", attempts + 1);
                return result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnomalyKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = invoke_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Anomaly::new(AnomalyKind::Busy))
                    } else {
                        Ok(42)
                    }
                }
            },
            &|r: &Result<i32, Anomaly>| matches!(r, Err(e) if e.is_retriable_default()),
            &|attempts| if attempts < 3 { Some(1) } else { None },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retriable_anomaly() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, Anomaly> = invoke_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Anomaly::new(AnomalyKind::Forbidden)) }
            },
            &|r: &Result<i32, Anomaly>| matches!(r, Err(e) if e.is_retriable_default()),
            &default_backoff,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
