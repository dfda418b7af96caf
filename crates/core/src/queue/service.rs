//! Append and replay logic for the pending-operation queue.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::backend::{BackendClient, XpAddRequest};
use crate::errors::Result;
use crate::store::{self, keys, KeyValueStore};
use crate::utils::time_utils::Clock;

use super::model::{OperationKind, QueuedOperation};

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    pub replayed: usize,
    pub remaining: usize,
}

/// Append-only log of actions that failed to reach the backend, replayed in
/// FIFO order when connectivity returns. Delivery is at-least-once: an
/// operation is removed only after the backend confirmed it, so a crash
/// between confirmation and dequeue re-sends it (the endpoints tolerate
/// duplicates).
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BackendClient>,
    clock: Arc<dyn Clock>,
    /// Serializes drain passes so two triggers cannot interleave removals.
    drain_mutex: Mutex<()>,
}

impl OfflineQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            backend,
            clock,
            drain_mutex: Mutex::new(()),
        }
    }

    /// Append unconditionally. A storage failure here is logged, not retried:
    /// the caller's local mutation already succeeded and must not be failed
    /// retroactively.
    pub async fn enqueue(&self, kind: OperationKind) {
        let mut operations = self.load().await;
        let operation = QueuedOperation::new(kind, self.clock.now());
        debug!(
            "queueing {} operation {} for replay",
            operation.kind.type_name(),
            operation.id
        );
        operations.push(operation);
        if let Err(err) =
            store::set_json(self.store.as_ref(), keys::PENDING_OPERATIONS, &operations).await
        {
            warn!("failed to persist pending operation: {}", err);
        }
    }

    /// Number of operations waiting for replay.
    pub async fn pending_count(&self) -> usize {
        self.load().await.len()
    }

    /// Operations currently waiting for replay, in FIFO order.
    pub async fn pending(&self) -> Vec<QueuedOperation> {
        self.load().await
    }

    /// Replay every queued operation in FIFO order. The first failure stops
    /// the pass; the failed operation and everything behind it stay queued in
    /// order, and the next pass starts again from the front. Each success
    /// removes exactly that operation.
    ///
    /// An auth failure propagates so the reconciler can run the forced-logout
    /// path.
    pub async fn drain_and_replay(&self, token: &str) -> Result<DrainOutcome> {
        let _guard = self.drain_mutex.lock().await;
        let mut operations = self.load().await;
        let mut replayed = 0usize;

        while let Some(operation) = operations.first().cloned() {
            match self.replay(&operation, token).await {
                Ok(()) => {
                    operations.remove(0);
                    store::set_json(self.store.as_ref(), keys::PENDING_OPERATIONS, &operations)
                        .await?;
                    replayed += 1;
                }
                Err(err) if err.is_auth_failure() => return Err(err),
                Err(err) => {
                    debug!("replay stopped at operation {}: {}", operation.id, err);
                    break;
                }
            }
        }

        Ok(DrainOutcome {
            replayed,
            remaining: operations.len(),
        })
    }

    /// Drop all pending operations. Used on logout: queued operations carry
    /// one user's progress and must not replay into another session.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(keys::PENDING_OPERATIONS).await
    }

    async fn replay(&self, operation: &QueuedOperation, token: &str) -> Result<()> {
        match &operation.kind {
            OperationKind::SyncXp { amount, source } => {
                self.backend
                    .add_xp(
                        token,
                        XpAddRequest {
                            amount: *amount,
                            source: source.clone(),
                        },
                    )
                    .await
            }
        }
    }

    async fn load(&self) -> Vec<QueuedOperation> {
        store::get_json(self.store.as_ref(), keys::PENDING_OPERATIONS)
            .await
            .unwrap_or_default()
    }
}
