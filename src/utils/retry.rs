use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Retries a store operation with bounded exponential backoff.
///
/// Only [`StoreError::Unavailable`] is retried; every other error (and
/// success) is returned immediately. Callers must only pass idempotent
/// operations — reads and the compensating release. `try_reserve` is never
/// routed through here, because after a transient failure its effect is
/// unknown and a blind retry could double-reserve.
pub async fn with_retry<T, F, Fut>(operation: &'static str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(StoreError::Unavailable(reason)) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(operation, attempt, %reason, "transient store failure, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}
