//! Background reconcile loop: periodic queue drain, class retry, and
//! wellbeing push while a token is present.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use crate::context::ServiceContext;
use crate::errors::Result;
use crate::session::SyncPass;

use super::{
    backoff_seconds, BACKGROUND_SYNC_INTERVAL_SECS, BACKGROUND_SYNC_JITTER_SECS,
    PENDING_DRAIN_DELAY_MS,
};

/// Spawn the periodic reconcile loop if it is not already running. The
/// handle lives in the runtime state and is aborted by
/// [`ensure_background_sync_stopped`].
pub async fn ensure_background_sync_started(context: Arc<ServiceContext>) -> Result<()> {
    let runtime = context.runtime();
    let mut guard = runtime.background_task.lock().await;
    if let Some(handle) = guard.as_ref() {
        if !handle.is_finished() {
            return Ok(());
        }
        guard.take();
    }

    let handle = tokio::spawn(async move {
        let mut consecutive_failures: i32 = 0;
        loop {
            let jitter_bound = BACKGROUND_SYNC_JITTER_SECS.saturating_mul(1000);
            let jitter_ms = if jitter_bound > 0 {
                Utc::now().timestamp_millis().unsigned_abs() % jitter_bound
            } else {
                0
            };
            let mut delay_ms = BACKGROUND_SYNC_INTERVAL_SECS.saturating_mul(1000) + jitter_ms;
            if consecutive_failures > 0 {
                delay_ms = delay_ms
                    .max(backoff_seconds(consecutive_failures).unsigned_abs() * 1000);
            }
            // Drain sooner when something is known to be waiting.
            if consecutive_failures == 0 && context.queue().pending_count().await > 0 {
                delay_ms = delay_ms.min(PENDING_DRAIN_DELAY_MS + (jitter_ms % 500));
            }
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            match context.session().reconnect_sync().await {
                SyncPass::Degraded => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!(
                        "background pass degraded ({} consecutive)",
                        consecutive_failures
                    );
                }
                pass => {
                    consecutive_failures = 0;
                    if pass == SyncPass::Completed {
                        context.screen_time().sync_records().await;
                    }
                    debug!("background pass complete ({:?})", pass);
                }
            }
        }
    });
    *guard = Some(handle);
    Ok(())
}

/// Abort the reconcile loop and cancel the tracker's tick task so no timer
/// fires against a torn-down session.
pub async fn ensure_background_sync_stopped(context: Arc<ServiceContext>) -> Result<()> {
    let runtime = context.runtime();
    let mut guard = runtime.background_task.lock().await;
    if let Some(handle) = guard.take() {
        handle.abort();
    }
    drop(guard);
    context.screen_time().shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;
    use crate::test_support::MockBackend;

    #[tokio::test]
    async fn start_is_idempotent_and_stop_clears_the_handle() {
        let context = Arc::new(ServiceContext::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MockBackend::new()),
        ));

        ensure_background_sync_started(context.clone()).await.unwrap();
        ensure_background_sync_started(context.clone()).await.unwrap();
        assert!(context.runtime().background_task.lock().await.is_some());

        ensure_background_sync_stopped(context.clone()).await.unwrap();
        assert!(context.runtime().background_task.lock().await.is_none());
    }
}
