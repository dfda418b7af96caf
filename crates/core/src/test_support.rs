//! Shared test fixtures: a scripted mock backend and a manual clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;

use crate::backend::{
    AuthResponse, BackendClient, CheckinResponse, LoginRequest, RegisterRequest,
    SelectClassRequest, WellbeingSyncRequest, XpAddRequest, XpSyncRequest,
};
use crate::classes::ClassLevel;
use crate::errors::{Error, Result};
use crate::session::{UserProfile, UserRole, UserStatus};
use crate::store::{KeyValueStore, MemoryKeyValueStore};
use crate::utils::time_utils::Clock;

/// Clock whose "now" is advanced explicitly by tests.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self::at(date.and_hms_opt(9, 0, 0).unwrap().and_utc())
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += duration;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.read().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Store double whose reads and/or writes fail on demand with a storage
/// error, for exercising the storage-failure taxonomy.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryKeyValueStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage("scripted read failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("scripted write failure"));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("scripted write failure"));
        }
        self.inner.remove(key).await
    }
}

/// What a scripted endpoint call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Ok,
    Offline,
    Unauthorized,
    Status(u16),
}

impl Script {
    fn apply(self) -> Result<()> {
        match self {
            Script::Ok => Ok(()),
            Script::Offline => Err(Error::network("connection refused")),
            Script::Unauthorized => Err(Error::api(401, "unauthorized")),
            Script::Status(status) => Err(Error::api(status, "scripted failure")),
        }
    }
}

pub fn sample_user(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: "Asha".to_string(),
        email: Some("asha@example.com".to_string()),
        role: UserRole::Student,
        status: UserStatus::Active,
        selected_class: None,
        extra: serde_json::Map::new(),
    }
}

/// Backend double recording every call; behavior is controlled by a default
/// script plus an optional per-call script queue for `add_xp`.
pub struct MockBackend {
    default_script: Mutex<Script>,
    add_xp_script: Mutex<Vec<Script>>,
    checkin: Mutex<CheckinResponse>,
    profile: Mutex<Option<UserProfile>>,
    update_profile_response: Mutex<Value>,

    pub login_calls: Mutex<Vec<LoginRequest>>,
    pub sync_xp_calls: Mutex<Vec<XpSyncRequest>>,
    pub add_xp_calls: Mutex<Vec<XpAddRequest>>,
    pub checkin_calls: Mutex<Vec<()>>,
    pub update_profile_calls: Mutex<Vec<Value>>,
    pub select_class_calls: Mutex<Vec<ClassLevel>>,
    pub wellbeing_calls: Mutex<Vec<WellbeingSyncRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            default_script: Mutex::new(Script::Ok),
            add_xp_script: Mutex::new(Vec::new()),
            checkin: Mutex::new(CheckinResponse {
                already_checked_in: true,
                streak: 0,
            }),
            profile: Mutex::new(None),
            update_profile_response: Mutex::new(Value::Object(serde_json::Map::new())),
            login_calls: Mutex::new(Vec::new()),
            sync_xp_calls: Mutex::new(Vec::new()),
            add_xp_calls: Mutex::new(Vec::new()),
            checkin_calls: Mutex::new(Vec::new()),
            update_profile_calls: Mutex::new(Vec::new()),
            select_class_calls: Mutex::new(Vec::new()),
            wellbeing_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_default_script(&self, script: Script) {
        *self.default_script.lock().unwrap() = script;
    }

    /// Scripts consumed front-to-back by `add_xp`; the default script applies
    /// once the list is exhausted.
    pub fn script_add_xp(&self, scripts: Vec<Script>) {
        *self.add_xp_script.lock().unwrap() = scripts;
    }

    pub fn set_checkin(&self, response: CheckinResponse) {
        *self.checkin.lock().unwrap() = response;
    }

    pub fn set_profile(&self, profile: UserProfile) {
        *self.profile.lock().unwrap() = Some(profile);
    }

    pub fn set_update_profile_response(&self, response: Value) {
        *self.update_profile_response.lock().unwrap() = response;
    }

    fn default(&self) -> Result<()> {
        self.default_script.lock().unwrap().apply()
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        self.login_calls.lock().unwrap().push(request);
        self.default()?;
        Ok(AuthResponse {
            user: sample_user("u1"),
            token: "tok-123".to_string(),
        })
    }

    async fn register(&self, _request: RegisterRequest) -> Result<AuthResponse> {
        self.default()?;
        Ok(AuthResponse {
            user: sample_user("u1"),
            token: "tok-123".to_string(),
        })
    }

    async fn sync_xp(&self, _token: &str, request: XpSyncRequest) -> Result<()> {
        self.sync_xp_calls.lock().unwrap().push(request);
        self.default()
    }

    async fn add_xp(&self, _token: &str, request: XpAddRequest) -> Result<()> {
        self.add_xp_calls.lock().unwrap().push(request);
        let scripted = {
            let mut scripts = self.add_xp_script.lock().unwrap();
            if scripts.is_empty() {
                None
            } else {
                Some(scripts.remove(0))
            }
        };
        match scripted {
            Some(script) => script.apply(),
            None => self.default(),
        }
    }

    async fn streak_checkin(&self, _token: &str) -> Result<CheckinResponse> {
        self.checkin_calls.lock().unwrap().push(());
        self.default()?;
        Ok(*self.checkin.lock().unwrap())
    }

    async fn update_profile(&self, _token: &str, patch: Value) -> Result<Value> {
        self.update_profile_calls.lock().unwrap().push(patch);
        self.default()?;
        Ok(self.update_profile_response.lock().unwrap().clone())
    }

    async fn select_class(&self, _token: &str, request: SelectClassRequest) -> Result<()> {
        self.select_class_calls.lock().unwrap().push(request.class_id);
        self.default()
    }

    async fn fetch_profile(&self, _token: &str) -> Result<UserProfile> {
        self.default()?;
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::api(404, "no profile"))
    }

    async fn sync_wellbeing(&self, _token: &str, request: WellbeingSyncRequest) -> Result<()> {
        self.wellbeing_calls.lock().unwrap().push(request);
        self.default()
    }
}
