//! Screen-time session tracker driven by app visibility transitions.
//!
//! The host shell forwards foreground/background transitions; the tracker
//! never polls. While a session is active, a 60-second tick task commits one
//! minute at a time so an abnormal termination loses at most one interval.
//! The background transition makes a final reconciling commit of
//! `floor(elapsed) - ticks_committed` minutes.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::{BackendClient, WellbeingSyncRequest};
use crate::session::UserProfile;
use crate::store::{self, keys, KeyValueStore};
use crate::sync::SESSION_TICK_INTERVAL_SECS;
use crate::utils::time_utils::Clock;

use super::model::{ActiveSession, ActivityCategory, DailyScreenTime};

/// Rolling retention window for daily records, pruned on every write.
pub const SCREEN_TIME_RETENTION_DAYS: i64 = 30;

/// External foreground/background signal the tracker subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppVisibility {
    Foreground,
    Background,
}

pub struct ScreenTimeTracker {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BackendClient>,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<ActiveSession>>,
    category: StdMutex<ActivityCategory>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

impl ScreenTimeTracker {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            backend,
            clock,
            active: Mutex::new(None),
            category: StdMutex::new(ActivityCategory::default()),
            tick_task: Mutex::new(None),
        }
    }

    /// Drive the INACTIVE <-> SESSION_ACTIVE transitions.
    pub async fn handle_visibility(self: &Arc<Self>, visibility: AppVisibility) {
        match visibility {
            AppVisibility::Foreground => self.begin_session().await,
            AppVisibility::Background => self.end_session().await,
        }
    }

    /// Redirect subsequent minutes to a different bucket without starting a
    /// new session.
    pub fn set_activity(&self, category: ActivityCategory) {
        if let Ok(mut current) = self.category.lock() {
            *current = category;
        }
    }

    /// Retained daily records, oldest first.
    pub async fn records(&self) -> Vec<DailyScreenTime> {
        store::get_json(self.store.as_ref(), keys::SCREEN_TIME_DATA)
            .await
            .unwrap_or_default()
    }

    /// Cold-start recovery: tick minutes from a crashed session are already
    /// durable, so the stale marker is dropped rather than guessing an end
    /// time.
    pub async fn recover_interrupted_session(&self) {
        let stale: Option<ActiveSession> =
            store::get_json(self.store.as_ref(), keys::CURRENT_SESSION).await;
        if let Some(stale) = stale {
            info!(
                "dropping interrupted session from {} ({} minutes already committed)",
                stale.started_at, stale.ticks_committed
            );
            if let Err(err) = self.store.remove(keys::CURRENT_SESSION).await {
                warn!("failed to clear stale session marker: {}", err);
            }
        }
    }

    /// Cancel the tick task on teardown so no tick lands on a torn-down
    /// session.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.tick_task.lock().await.take() {
            handle.abort();
        }
        *self.active.lock().await = None;
    }

    async fn begin_session(self: &Arc<Self>) {
        {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return;
            }
            let session = ActiveSession {
                started_at: self.clock.now(),
                ticks_committed: 0,
                category: self.current_category(),
            };
            // Persist before anything else so a crash mid-session is
            // recoverable from the stored timestamp.
            if let Err(err) =
                store::set_json(self.store.as_ref(), keys::CURRENT_SESSION, &session).await
            {
                warn!("failed to persist session marker: {}", err);
            }
            *active = Some(session);
        }

        self.mutate_today(|record| record.sessions += 1).await;

        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(SESSION_TICK_INTERVAL_SECS)).await;
                if !tracker.commit_tick().await {
                    break;
                }
            }
        });
        let mut guard = self.tick_task.lock().await;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    /// Commit one interval of foreground time into today's record. Returns
    /// false once there is no active session left to account against.
    pub(crate) async fn commit_tick(&self) -> bool {
        let snapshot = {
            let mut active = self.active.lock().await;
            let Some(session) = active.as_mut() else {
                return false;
            };
            session.ticks_committed += 1;
            session.category = self.current_category();
            *session
        };

        self.mutate_today(|record| {
            record.total_minutes += 1;
            record.breakdown.add(snapshot.category, 1);
        })
        .await;
        if let Err(err) =
            store::set_json(self.store.as_ref(), keys::CURRENT_SESSION, &snapshot).await
        {
            warn!("failed to refresh session marker: {}", err);
        }
        true
    }

    async fn end_session(&self) {
        if let Some(handle) = self.tick_task.lock().await.take() {
            handle.abort();
        }

        let Some(session) = self.active.lock().await.take() else {
            return;
        };
        let elapsed = self.clock.now().signed_duration_since(session.started_at);
        // Floor of elapsed wall-clock minutes; ticks already committed are
        // subtracted so nothing is double counted.
        let elapsed_minutes = elapsed.num_minutes().max(0) as u32;
        let remainder = elapsed_minutes.saturating_sub(session.ticks_committed);
        if remainder > 0 {
            let category = self.current_category();
            self.mutate_today(|record| {
                record.total_minutes += remainder;
                record.breakdown.add(category, remainder);
            })
            .await;
        }
        debug!(
            "session ended: {} elapsed minutes, {} via ticks",
            elapsed_minutes, session.ticks_committed
        );
        if let Err(err) = self.store.remove(keys::CURRENT_SESSION).await {
            warn!("failed to clear session marker: {}", err);
        }

        self.sync_records().await;
    }

    /// Best-effort push of all retained records. Failure is logged and left
    /// to the next pass; nothing is queued.
    pub async fn sync_records(&self) {
        let token = match self.store.get(keys::AUTH_TOKEN).await {
            Ok(Some(token)) => token,
            _ => return,
        };
        let Some(user) = store::get_json::<UserProfile>(self.store.as_ref(), keys::USER).await
        else {
            return;
        };
        let records = self.records().await;
        if records.is_empty() {
            return;
        }
        if let Err(err) = self
            .backend
            .sync_wellbeing(
                &token,
                WellbeingSyncRequest {
                    user_id: user.id,
                    screen_time_data: records,
                },
            )
            .await
        {
            warn!("wellbeing sync deferred: {}", err);
        }
    }

    fn current_category(&self) -> ActivityCategory {
        self.category
            .lock()
            .map(|category| *category)
            .unwrap_or_default()
    }

    async fn mutate_today(&self, mutate: impl FnOnce(&mut DailyScreenTime)) {
        let today = self.clock.today();
        let mut records = self.records().await;
        if !records.iter().any(|record| record.date == today) {
            records.push(DailyScreenTime::empty(today));
        }
        if let Some(record) = records.iter_mut().find(|record| record.date == today) {
            mutate(record);
        }

        // Rolling retention, enforced on every write.
        let cutoff = today - chrono::Duration::days(SCREEN_TIME_RETENTION_DAYS - 1);
        records.retain(|record| record.date >= cutoff);
        records.sort_by_key(|record| record.date);

        if let Err(err) =
            store::set_json(self.store.as_ref(), keys::SCREEN_TIME_DATA, &records).await
        {
            warn!("failed to persist screen time: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;
    use crate::test_support::{sample_user, MockBackend, ManualClock};
    use chrono::{Duration as ChronoDuration, NaiveDate};

    struct Fixture {
        store: Arc<MemoryKeyValueStore>,
        backend: Arc<MockBackend>,
        clock: Arc<ManualClock>,
        tracker: Arc<ScreenTimeTracker>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryKeyValueStore::new());
        let backend = Arc::new(MockBackend::new());
        let clock = Arc::new(ManualClock::on_date(
            NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
        ));
        let tracker = Arc::new(ScreenTimeTracker::new(
            store.clone() as Arc<dyn KeyValueStore>,
            backend.clone() as Arc<dyn BackendClient>,
            clock.clone() as Arc<dyn Clock>,
        ));
        Fixture {
            store,
            backend,
            clock,
            tracker,
        }
    }

    #[tokio::test]
    async fn elapsed_minutes_are_floored_without_ticks() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        // 3.5 minutes foreground, no tick fired near the boundary.
        fx.clock.advance(ChronoDuration::seconds(210));
        fx.tracker.handle_visibility(AppVisibility::Background).await;

        let records = fx.tracker.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_minutes, 3);
        assert_eq!(records[0].sessions, 1);
    }

    #[tokio::test]
    async fn ticks_and_final_commit_do_not_double_count() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.clock.advance(ChronoDuration::seconds(210));
        // Three ticks already committed their minutes.
        for _ in 0..3 {
            assert!(fx.tracker.commit_tick().await);
        }
        fx.tracker.handle_visibility(AppVisibility::Background).await;

        let records = fx.tracker.records().await;
        assert_eq!(records[0].total_minutes, 3);
    }

    #[tokio::test]
    async fn set_activity_redirects_minutes_mid_session() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.tracker.set_activity(ActivityCategory::Games);
        fx.tracker.commit_tick().await;
        fx.tracker.set_activity(ActivityCategory::Lessons);
        fx.tracker.commit_tick().await;
        fx.clock.advance(ChronoDuration::seconds(120));
        fx.tracker.handle_visibility(AppVisibility::Background).await;

        let records = fx.tracker.records().await;
        assert_eq!(records[0].breakdown.games, 1);
        assert_eq!(records[0].breakdown.lessons, 1);
        assert_eq!(records[0].total_minutes, 2);
    }

    #[tokio::test]
    async fn session_marker_persists_and_clears() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        assert!(fx.store.get(keys::CURRENT_SESSION).await.unwrap().is_some());
        fx.tracker.handle_visibility(AppVisibility::Background).await;
        assert!(fx.store.get(keys::CURRENT_SESSION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recovery_drops_stale_marker_keeping_committed_minutes() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.tracker.commit_tick().await;
        // Simulate a crash: a new tracker starts with the marker still set.
        let revived = Arc::new(ScreenTimeTracker::new(
            fx.store.clone() as Arc<dyn KeyValueStore>,
            fx.backend.clone() as Arc<dyn BackendClient>,
            fx.clock.clone() as Arc<dyn Clock>,
        ));
        revived.recover_interrupted_session().await;
        assert!(fx.store.get(keys::CURRENT_SESSION).await.unwrap().is_none());
        assert_eq!(revived.records().await[0].total_minutes, 1);
    }

    #[tokio::test]
    async fn records_older_than_retention_are_pruned() {
        let fx = fixture();
        let old = DailyScreenTime::empty(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        let recent = DailyScreenTime::empty(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        store::set_json(
            fx.store.as_ref(),
            keys::SCREEN_TIME_DATA,
            &vec![old, recent],
        )
        .await
        .unwrap();

        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.clock.advance(ChronoDuration::seconds(60));
        fx.tracker.handle_visibility(AppVisibility::Background).await;

        let dates: Vec<NaiveDate> = fx
            .tracker
            .records()
            .await
            .iter()
            .map(|record| record.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn background_sync_pushes_records_when_authenticated() {
        let fx = fixture();
        fx.store.set(keys::AUTH_TOKEN, "tok").await.unwrap();
        store::set_json(fx.store.as_ref(), keys::USER, &sample_user("u1"))
            .await
            .unwrap();

        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.clock.advance(ChronoDuration::seconds(90));
        fx.tracker.handle_visibility(AppVisibility::Background).await;

        let calls = fx.backend.wellbeing_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user_id, "u1");
        assert_eq!(calls[0].screen_time_data[0].total_minutes, 1);
    }

    #[tokio::test]
    async fn anonymous_sessions_skip_the_backend() {
        let fx = fixture();
        fx.tracker.handle_visibility(AppVisibility::Foreground).await;
        fx.clock.advance(ChronoDuration::seconds(90));
        fx.tracker.handle_visibility(AppVisibility::Background).await;
        assert!(fx.backend.wellbeing_calls.lock().unwrap().is_empty());
    }
}
