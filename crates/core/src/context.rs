//! Explicit service wiring, constructed once at process start and passed by
//! reference to consumers. No module-level singletons.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::BackendClient;
use crate::classes::ClassSelectionService;
use crate::events::{DomainEventSink, NoOpDomainEventSink};
use crate::queue::OfflineQueue;
use crate::session::SessionService;
use crate::store::KeyValueStore;
use crate::utils::time_utils::{Clock, SystemClock};
use crate::wellbeing::ScreenTimeTracker;

/// Runtime state owned alongside the services.
#[derive(Debug, Default)]
pub struct SyncRuntimeState {
    /// Handle of the background reconcile loop, if running.
    pub background_task: Mutex<Option<JoinHandle<()>>>,
}

pub struct ServiceContext {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BackendClient>,
    queue: Arc<OfflineQueue>,
    session_service: Arc<SessionService>,
    class_service: Arc<ClassSelectionService>,
    screen_time_tracker: Arc<ScreenTimeTracker>,
    runtime: Arc<SyncRuntimeState>,
}

impl ServiceContext {
    /// Wire the full service graph with the system clock and no event sink.
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<dyn BackendClient>) -> Self {
        Self::with_clock_and_events(
            store,
            backend,
            Arc::new(SystemClock),
            Arc::new(NoOpDomainEventSink),
        )
    }

    /// Wire the full service graph with explicit clock and event sink.
    pub fn with_clock_and_events(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendClient>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventSink>,
    ) -> Self {
        let queue = Arc::new(OfflineQueue::new(
            store.clone(),
            backend.clone(),
            clock.clone(),
        ));
        let class_service = Arc::new(ClassSelectionService::new(
            store.clone(),
            backend.clone(),
            clock.clone(),
        ));
        let session_service = Arc::new(SessionService::new(
            store.clone(),
            backend.clone(),
            clock.clone(),
            events,
            queue.clone(),
            class_service.clone(),
        ));
        let screen_time_tracker = Arc::new(ScreenTimeTracker::new(
            store.clone(),
            backend.clone(),
            clock,
        ));
        Self {
            store,
            backend,
            queue,
            session_service,
            class_service,
            screen_time_tracker,
            runtime: Arc::new(SyncRuntimeState::default()),
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub fn backend(&self) -> Arc<dyn BackendClient> {
        Arc::clone(&self.backend)
    }

    pub fn queue(&self) -> Arc<OfflineQueue> {
        Arc::clone(&self.queue)
    }

    pub fn session(&self) -> Arc<SessionService> {
        Arc::clone(&self.session_service)
    }

    pub fn classes(&self) -> Arc<ClassSelectionService> {
        Arc::clone(&self.class_service)
    }

    pub fn screen_time(&self) -> Arc<ScreenTimeTracker> {
        Arc::clone(&self.screen_time_tracker)
    }

    pub fn runtime(&self) -> Arc<SyncRuntimeState> {
        Arc::clone(&self.runtime)
    }
}
