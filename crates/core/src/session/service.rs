//! Session/state reconciler.
//!
//! On cold start and on reconnect this service merges locally persisted
//! state with backend truth: it applies the streak rollover, pushes local
//! progress, runs the server-authoritative daily check-in, and triggers
//! queue replay and class-selection retry. Progress mutations always succeed
//! locally; only synchronization is ever deferred.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use log::{debug, info, warn};
use serde_json::Value;

use crate::backend::{
    AuthResponse, BackendClient, LoginRequest, RegisterRequest, XpAddRequest, XpSyncRequest,
};
use crate::classes::{ClassLevel, ClassSelectionService};
use crate::errors::Result;
use crate::events::{DomainEvent, DomainEventSink};
use crate::progress::{level_for_xp, roll_streak, ProgressState, StreakTransition};
use crate::queue::{OfflineQueue, OperationKind};
use crate::store::{self, keys, KeyValueStore};
use crate::utils::time_utils::Clock;

use super::model::{merge_object, SessionPhase, SessionSnapshot, UserProfile};

/// Outcome of one reconcile pass against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPass {
    /// No stored token; nothing to reconcile.
    Skipped,
    /// Every sub-step reached the backend.
    Completed,
    /// At least one sub-step was deferred (offline or server error).
    Degraded,
    /// An auth failure cleared the session mid-pass.
    LoggedOut,
}

pub struct SessionService {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BackendClient>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventSink>,
    queue: Arc<OfflineQueue>,
    classes: Arc<ClassSelectionService>,
    phase: RwLock<SessionPhase>,
    /// The streak rollover runs exactly once per cold start.
    streak_rolled: AtomicBool,
    /// One-shot level-up flag consumed by the presentation layer.
    pending_level_up: StdMutex<Option<u32>>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendClient>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventSink>,
        queue: Arc<OfflineQueue>,
        classes: Arc<ClassSelectionService>,
    ) -> Self {
        Self {
            store,
            backend,
            clock,
            events,
            queue,
            classes,
            phase: RwLock::new(SessionPhase::ColdStart),
            streak_rolled: AtomicBool::new(false),
            pending_level_up: StdMutex::new(None),
        }
    }

    /// Current reconciler phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
            .read()
            .map(|phase| *phase)
            .unwrap_or(SessionPhase::ColdStart)
    }

    fn set_phase(&self, phase: SessionPhase) {
        if let Ok(mut current) = self.phase.write() {
            *current = phase;
        }
    }

    /// Cold-start reconciliation: load local state, apply the streak
    /// rollover once, then sync authenticated sessions against the backend.
    /// Network failure is non-fatal; the UI proceeds with local state.
    pub async fn load_user(&self) -> Result<SessionSnapshot> {
        self.set_phase(SessionPhase::LoadingLocal);

        let user: Option<UserProfile> = store::get_json(self.store.as_ref(), keys::USER).await;
        let token = self.read_token().await;
        let is_guest = self.read_guest_flag().await;
        let mut progress = self.read_progress().await;

        if !self.streak_rolled.swap(true, Ordering::SeqCst) {
            let today = self.clock.today();
            let (streak, transition) = roll_streak(progress.streak, progress.last_login_date, today);
            if transition != StreakTransition::Unchanged {
                debug!(
                    "streak rollover: {} -> {} ({:?})",
                    progress.streak, streak, transition
                );
                self.events.emit(DomainEvent::StreakRolled { streak });
            }
            progress.streak = streak;
            progress.last_login_date = Some(today);
            self.persist_progress(&progress).await;
        }

        match (user, token) {
            (Some(user), Some(token)) => {
                self.set_phase(SessionPhase::Authenticated);
                if self.run_sync(&token).await == SyncPass::LoggedOut {
                    return Ok(SessionSnapshot::anonymous());
                }
                self.set_phase(SessionPhase::Ready);
                Ok(SessionSnapshot {
                    user: store::get_json(self.store.as_ref(), keys::USER)
                        .await
                        .or(Some(user)),
                    is_guest: false,
                    progress: self.read_progress().await,
                })
            }
            _ if is_guest => {
                self.set_phase(SessionPhase::Guest);
                self.set_phase(SessionPhase::Ready);
                Ok(SessionSnapshot {
                    user: None,
                    is_guest: true,
                    progress,
                })
            }
            _ => {
                self.set_phase(SessionPhase::Anonymous);
                Ok(SessionSnapshot {
                    user: None,
                    is_guest: false,
                    progress,
                })
            }
        }
    }

    /// Opportunistic reconcile trigger (app foreground, periodic timer).
    /// A no-op without a stored token.
    pub async fn reconnect_sync(&self) -> SyncPass {
        let Some(token) = self.read_token().await else {
            return SyncPass::Skipped;
        };
        // Syncing is only entered from Authenticated.
        self.set_phase(SessionPhase::Authenticated);
        let pass = self.run_sync(&token).await;
        if pass != SyncPass::LoggedOut {
            self.set_phase(SessionPhase::Ready);
        }
        pass
    }

    /// The `Syncing` step: push progress, server check-in, queue replay,
    /// class-selection retry. Every backend failure except an auth failure
    /// is non-fatal.
    async fn run_sync(&self, token: &str) -> SyncPass {
        self.set_phase(SessionPhase::Syncing);
        let mut degraded = false;
        let progress = self.read_progress().await;

        match self
            .backend
            .sync_xp(
                token,
                XpSyncRequest {
                    xp: progress.xp,
                    level: progress.level,
                },
            )
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_auth_failure() => {
                self.forced_logout().await;
                return SyncPass::LoggedOut;
            }
            Err(err) => {
                warn!("xp push deferred: {}", err);
                degraded = true;
            }
        }

        // The server owns the daily check-in; its streak only overwrites the
        // local value when today's check-in was actually applied now. Only
        // the streak key is written: xp may have moved while this pass was
        // in flight on the network.
        match self.backend.streak_checkin(token).await {
            Ok(response) if !response.already_checked_in => {
                if let Err(err) = self
                    .store
                    .set(keys::STREAK, &response.streak.to_string())
                    .await
                {
                    warn!("failed to persist '{}': {}", keys::STREAK, err);
                }
            }
            Ok(_) => {}
            Err(err) if err.is_auth_failure() => {
                self.forced_logout().await;
                return SyncPass::LoggedOut;
            }
            Err(err) => {
                warn!("streak check-in deferred: {}", err);
                degraded = true;
            }
        }

        match self.queue.drain_and_replay(token).await {
            Ok(outcome) => {
                if outcome.remaining > 0 {
                    degraded = true;
                }
                debug!(
                    "queue drain: {} replayed, {} remaining",
                    outcome.replayed, outcome.remaining
                );
            }
            Err(err) if err.is_auth_failure() => {
                self.forced_logout().await;
                return SyncPass::LoggedOut;
            }
            Err(err) => {
                warn!("queue drain interrupted: {}", err);
                degraded = true;
            }
        }

        match self.classes.retry_unsynced(token).await {
            Ok(()) => {}
            Err(err) if err.is_auth_failure() => {
                self.forced_logout().await;
                return SyncPass::LoggedOut;
            }
            Err(err) => {
                warn!("class selection retry failed: {}", err);
                degraded = true;
            }
        }
        match self.classes.adopt_remote(token).await {
            Ok(()) => {}
            Err(err) if err.is_auth_failure() => {
                self.forced_logout().await;
                return SyncPass::LoggedOut;
            }
            Err(err) => {
                warn!("class adoption failed: {}", err);
                degraded = true;
            }
        }

        if degraded {
            SyncPass::Degraded
        } else {
            SyncPass::Completed
        }
    }

    /// Optimistic XP credit: the local mutation always succeeds and is never
    /// rolled back; a failed online add is queued, not dropped.
    pub async fn add_xp(&self, amount: u64, source: &str) -> Result<ProgressState> {
        let mut progress = self.read_progress().await;
        let previous_level = level_for_xp(progress.xp);
        progress.xp = progress.xp.saturating_add(amount);
        progress.level = level_for_xp(progress.xp);

        if progress.level > previous_level {
            if let Ok(mut slot) = self.pending_level_up.lock() {
                *slot = Some(progress.level);
            }
            self.events.emit(DomainEvent::LevelUp {
                new_level: progress.level,
            });
        }
        self.persist_progress(&progress).await;

        match self.read_token().await {
            Some(token) => {
                let request = XpAddRequest {
                    amount,
                    source: source.to_string(),
                };
                match self.backend.add_xp(&token, request).await {
                    Ok(()) => {}
                    Err(err) if err.is_auth_failure() => {
                        self.forced_logout().await;
                        // The caller sees the post-logout state, not xp the
                        // store no longer holds.
                        return Ok(self.read_progress().await);
                    }
                    Err(err) => {
                        debug!("deferring xp credit: {}", err);
                        self.queue
                            .enqueue(OperationKind::SyncXp {
                                amount,
                                source: source.to_string(),
                            })
                            .await;
                    }
                }
            }
            None => {
                self.queue
                    .enqueue(OperationKind::SyncXp {
                        amount,
                        source: source.to_string(),
                    })
                    .await;
            }
        }
        Ok(progress)
    }

    /// One-shot level-up flag; `None` once consumed.
    pub fn take_level_up(&self) -> Option<u32> {
        self.pending_level_up
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }

    /// Apply a profile patch. Guests patch purely locally; authenticated
    /// users round-trip through the backend and the server's returned fields
    /// win on key collision. A `selectedClass` field additionally routes
    /// through class selection.
    pub async fn update_user(&self, patch: Value) -> Result<Option<UserProfile>> {
        let token = self.read_token().await;
        let stored: Option<UserProfile> = store::get_json(self.store.as_ref(), keys::USER).await;

        let updated = match (&stored, token.as_deref()) {
            (Some(user), Some(token)) => {
                let returned = match self.backend.update_profile(token, patch.clone()).await {
                    Ok(value) => value,
                    Err(err) if err.is_auth_failure() => {
                        self.forced_logout().await;
                        return Err(err);
                    }
                    // 4xx/network failures surface to the caller for display.
                    Err(err) => return Err(err),
                };
                let mut merged = serde_json::to_value(user)?;
                merge_object(&mut merged, &patch);
                merge_object(&mut merged, &returned);
                let merged: UserProfile = serde_json::from_value(merged)?;
                store::set_json(self.store.as_ref(), keys::USER, &merged).await?;
                Some(merged)
            }
            (Some(user), None) => {
                let mut merged = serde_json::to_value(user)?;
                merge_object(&mut merged, &patch);
                let merged: UserProfile = serde_json::from_value(merged)?;
                store::set_json(self.store.as_ref(), keys::USER, &merged).await?;
                Some(merged)
            }
            (None, _) => None,
        };

        if let Some(class_value) = patch.get("selectedClass") {
            if let Ok(class_id) = serde_json::from_value::<ClassLevel>(class_value.clone()) {
                match self.classes.select_class(class_id, token.as_deref()).await {
                    Ok(_) => {}
                    Err(err) if err.is_auth_failure() => {
                        self.forced_logout().await;
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(updated)
    }

    /// `POST /auth/login`; an explicit login is also a drain trigger for
    /// anything queued while offline.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let response = self
            .backend
            .login(LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.install_session(&response).await?;
        Ok(response.user)
    }

    /// `POST /auth/register`.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile> {
        let response = self.backend.register(request).await?;
        self.install_session(&response).await?;
        Ok(response.user)
    }

    async fn install_session(&self, response: &AuthResponse) -> Result<()> {
        self.store.set(keys::AUTH_TOKEN, &response.token).await?;
        store::set_json(self.store.as_ref(), keys::USER, &response.user).await?;
        self.store.remove(keys::GUEST_FLAG).await?;
        self.set_phase(SessionPhase::Authenticated);
        if self.run_sync(&response.token).await != SyncPass::LoggedOut {
            self.set_phase(SessionPhase::Ready);
        }
        Ok(())
    }

    /// Enter guest mode: no token, all state local.
    pub async fn enter_guest(&self) -> Result<()> {
        self.store.set(keys::GUEST_FLAG, "true").await?;
        self.set_phase(SessionPhase::Guest);
        Ok(())
    }

    /// User-initiated logout: remove every session-scoped key.
    pub async fn logout(&self) {
        self.set_phase(SessionPhase::LoggingOut);
        self.clear_session_state().await;
        self.set_phase(SessionPhase::Anonymous);
    }

    /// Fail-safe for expired/invalid credentials: the one unprompted
    /// transition to the logged-out state.
    async fn forced_logout(&self) {
        info!("authentication failure, clearing local session");
        self.set_phase(SessionPhase::LoggingOut);
        self.clear_session_state().await;
        self.set_phase(SessionPhase::Anonymous);
        self.events.emit(DomainEvent::SessionCleared);
    }

    async fn clear_session_state(&self) {
        for key in [
            keys::USER,
            keys::AUTH_TOKEN,
            keys::GUEST_FLAG,
            keys::XP,
            keys::LEVEL,
            keys::STREAK,
            keys::LAST_LOGIN_DATE,
        ] {
            if let Err(err) = self.store.remove(key).await {
                warn!("failed to remove '{}': {}", key, err);
            }
        }
        if let Err(err) = self.classes.clear().await {
            warn!("failed to clear class selection: {}", err);
        }
        if let Err(err) = self.queue.clear().await {
            warn!("failed to clear pending operations: {}", err);
        }
    }

    async fn read_token(&self) -> Option<String> {
        match self.store.get(keys::AUTH_TOKEN).await {
            Ok(token) => token,
            Err(err) => {
                warn!("token read failed: {}", err);
                None
            }
        }
    }

    async fn read_guest_flag(&self) -> bool {
        matches!(self.store.get(keys::GUEST_FLAG).await, Ok(Some(flag)) if flag == "true")
    }

    /// Progress read from independent keys. The stored level is never an
    /// input: it is recomputed from xp on every read, so a crash between the
    /// xp and level writes self-heals on the next load.
    async fn read_progress(&self) -> ProgressState {
        let xp = self.read_number(keys::XP).await.unwrap_or(0);
        let streak = self.read_number(keys::STREAK).await.unwrap_or(0) as u32;
        let last_login_date = match self.store.get(keys::LAST_LOGIN_DATE).await {
            Ok(Some(raw)) => raw.parse().ok(),
            _ => None,
        };
        ProgressState {
            xp,
            level: level_for_xp(xp),
            streak,
            last_login_date,
        }
    }

    async fn read_number(&self, key: &str) -> Option<u64> {
        match self.store.get(key).await {
            Ok(Some(raw)) => raw.parse().ok(),
            Ok(None) => None,
            Err(err) => {
                warn!("store read failed for '{}': {}", key, err);
                None
            }
        }
    }

    /// Independent per-key writes; failures are logged, never propagated —
    /// a missed write is reconciled by recompute-on-load.
    async fn persist_progress(&self, progress: &ProgressState) {
        let writes = [
            (keys::XP, progress.xp.to_string()),
            (keys::LEVEL, progress.level.to_string()),
            (keys::STREAK, progress.streak.to_string()),
        ];
        for (key, value) in writes {
            if let Err(err) = self.store.set(key, &value).await {
                warn!("failed to persist '{}': {}", key, err);
            }
        }
        if let Some(date) = progress.last_login_date {
            if let Err(err) = self.store.set(keys::LAST_LOGIN_DATE, &date.to_string()).await {
                warn!("failed to persist '{}': {}", keys::LAST_LOGIN_DATE, err);
            }
        }
    }
}
