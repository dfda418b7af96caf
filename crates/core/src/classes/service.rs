//! Class selection service: persist locally first, then push to the backend.

use std::sync::Arc;

use log::{debug, warn};

use crate::backend::{BackendClient, SelectClassRequest};
use crate::errors::Result;
use crate::store::{self, keys, KeyValueStore};
use crate::utils::time_utils::Clock;

use super::model::{ClassLevel, ClassSelection};

pub struct ClassSelectionService {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BackendClient>,
    clock: Arc<dyn Clock>,
}

impl ClassSelectionService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            backend,
            clock,
        }
    }

    /// Currently stored selection, if any.
    pub async fn current(&self) -> Option<ClassSelection> {
        store::get_json(self.store.as_ref(), keys::SELECTED_CLASS).await
    }

    /// Persist the selection unsynced, then push when a token is available.
    /// A non-auth push failure leaves the record as a retry candidate for
    /// [`Self::retry_unsynced`]; an auth failure propagates to the caller.
    pub async fn select_class(
        &self,
        class_id: ClassLevel,
        token: Option<&str>,
    ) -> Result<ClassSelection> {
        let mut selection = ClassSelection {
            class_id,
            selected_at: self.clock.now(),
            synced: false,
        };
        store::set_json(self.store.as_ref(), keys::SELECTED_CLASS, &selection).await?;

        if let Some(token) = token {
            match self
                .backend
                .select_class(token, SelectClassRequest { class_id })
                .await
            {
                Ok(()) => {
                    selection.synced = true;
                    store::set_json(self.store.as_ref(), keys::SELECTED_CLASS, &selection).await?;
                }
                Err(err) if err.is_auth_failure() => return Err(err),
                Err(err) => warn!("class selection push deferred: {}", err),
            }
        }
        Ok(selection)
    }

    /// Re-push a selection the backend has not acknowledged yet. Invoked as a
    /// sync sub-step and by the periodic background pass.
    pub async fn retry_unsynced(&self, token: &str) -> Result<()> {
        let Some(mut selection) = self.current().await else {
            return Ok(());
        };
        if selection.synced {
            return Ok(());
        }
        match self
            .backend
            .select_class(
                token,
                SelectClassRequest {
                    class_id: selection.class_id,
                },
            )
            .await
        {
            Ok(()) => {
                selection.synced = true;
                store::set_json(self.store.as_ref(), keys::SELECTED_CLASS, &selection).await?;
            }
            Err(err) if err.is_auth_failure() => return Err(err),
            Err(err) => debug!("class selection retry deferred: {}", err),
        }
        Ok(())
    }

    /// Pull side of the contract: adopt the server's class when nothing is
    /// selected locally.
    pub async fn adopt_remote(&self, token: &str) -> Result<()> {
        if self.current().await.is_some() {
            return Ok(());
        }
        match self.backend.fetch_profile(token).await {
            Ok(profile) => {
                if let Some(class_id) = profile.selected_class {
                    let selection = ClassSelection {
                        class_id,
                        selected_at: self.clock.now(),
                        synced: true,
                    };
                    store::set_json(self.store.as_ref(), keys::SELECTED_CLASS, &selection).await?;
                }
                Ok(())
            }
            Err(err) if err.is_auth_failure() => Err(err),
            Err(err) => {
                debug!("profile pull skipped: {}", err);
                Ok(())
            }
        }
    }

    /// Remove the stored selection (logout path).
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(keys::SELECTED_CLASS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;
    use crate::test_support::{sample_user, MockBackend, ManualClock, Script};
    use chrono::NaiveDate;

    fn service_with(backend: Arc<MockBackend>) -> ClassSelectionService {
        let clock = Arc::new(ManualClock::on_date(
            NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
        ));
        ClassSelectionService::new(Arc::new(MemoryKeyValueStore::new()), backend, clock)
    }

    #[tokio::test]
    async fn offline_selection_stays_unsynced_then_retries() {
        let backend = Arc::new(MockBackend::new());
        let service = service_with(backend.clone());

        backend.set_default_script(Script::Offline);
        let selection = service
            .select_class(ClassLevel::Class8, Some("tok"))
            .await
            .unwrap();
        assert!(!selection.synced);
        assert!(!service.current().await.unwrap().synced);

        backend.set_default_script(Script::Ok);
        service.retry_unsynced("tok").await.unwrap();
        assert!(service.current().await.unwrap().synced);
        assert_eq!(backend.select_class_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn synced_selection_is_not_repushed() {
        let backend = Arc::new(MockBackend::new());
        let service = service_with(backend.clone());

        service
            .select_class(ClassLevel::Class10, Some("tok"))
            .await
            .unwrap();
        assert!(service.current().await.unwrap().synced);

        service.retry_unsynced("tok").await.unwrap();
        assert_eq!(backend.select_class_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn guest_selection_without_token_is_local_only() {
        let backend = Arc::new(MockBackend::new());
        let service = service_with(backend.clone());

        let selection = service.select_class(ClassLevel::Class6, None).await.unwrap();
        assert!(!selection.synced);
        assert!(backend.select_class_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn adopt_remote_fills_missing_selection_only() {
        let backend = Arc::new(MockBackend::new());
        let service = service_with(backend.clone());

        let mut user = sample_user("u1");
        user.selected_class = Some(ClassLevel::Class9);
        backend.set_profile(user);

        service.adopt_remote("tok").await.unwrap();
        let adopted = service.current().await.unwrap();
        assert_eq!(adopted.class_id, ClassLevel::Class9);
        assert!(adopted.synced);

        // A local selection is never overwritten by the pull.
        service.select_class(ClassLevel::Class7, None).await.unwrap();
        service.adopt_remote("tok").await.unwrap();
        assert_eq!(service.current().await.unwrap().class_id, ClassLevel::Class7);
    }
}
