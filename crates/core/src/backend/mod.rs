//! Backend API contract consumed by the sync core.
//!
//! The REST implementation lives in `studypath-connect`; the core only
//! depends on this trait so every service is testable against a scripted
//! backend.

mod model;

pub use model::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::session::UserProfile;

/// Client for the StudyPath backend. All authenticated calls carry a bearer
/// token; a 401-class response surfaces as an auth failure and triggers the
/// reconciler's forced-logout path.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse>;

    /// `POST /auth/register`
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse>;

    /// `PUT /xp/sync` — push absolute local progress.
    async fn sync_xp(&self, token: &str, request: XpSyncRequest) -> Result<()>;

    /// `POST /xp/add` — additive XP credit; the endpoint is idempotent with
    /// respect to replayed operations.
    async fn add_xp(&self, token: &str, request: XpAddRequest) -> Result<()>;

    /// `POST /streak/checkin` — server-authoritative daily check-in.
    async fn streak_checkin(&self, token: &str) -> Result<CheckinResponse>;

    /// `PUT /auth/profile` — partial user patch; returns the merged fields.
    async fn update_profile(&self, token: &str, patch: Value) -> Result<Value>;

    /// `POST /user/select-class`
    async fn select_class(&self, token: &str, request: SelectClassRequest) -> Result<()>;

    /// `GET /user/profile`
    async fn fetch_profile(&self, token: &str) -> Result<UserProfile>;

    /// `POST /wellbeing/sync` — push retained daily screen-time records.
    async fn sync_wellbeing(&self, token: &str, request: WellbeingSyncRequest) -> Result<()>;
}
