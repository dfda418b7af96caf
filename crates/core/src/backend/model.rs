//! Request/response payloads for the backend API.

use serde::{Deserialize, Serialize};

use crate::classes::ClassLevel;
use crate::session::{UserProfile, UserRole};
use crate::wellbeing::DailyScreenTime;

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Session material returned by login and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Absolute progress push for `PUT /xp/sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpSyncRequest {
    pub xp: u64,
    pub level: u32,
}

/// Additive XP credit for `POST /xp/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAddRequest {
    pub amount: u64,
    pub source: String,
}

/// `POST /streak/checkin` result. The server owns the daily check-in
/// decision; `streak` only overwrites the local value when
/// `already_checked_in` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub already_checked_in: bool,
    pub streak: u32,
}

/// Payload for `POST /user/select-class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectClassRequest {
    pub class_id: ClassLevel,
}

/// Payload for `POST /wellbeing/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellbeingSyncRequest {
    pub user_id: String,
    pub screen_time_data: Vec<DailyScreenTime>,
}

/// Error body shape returned by the backend on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: String,
    pub message: String,
}
