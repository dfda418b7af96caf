//! Session domain models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classes::ClassLevel;
use crate::progress::ProgressState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Institute,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Pending,
}

/// Locally persisted user snapshot. Unknown backend fields ride along in
/// `extra` so a profile merge never drops data this client does not model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_class: Option<ClassLevel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reconciler lifecycle. `LoggingOut -> Anonymous` is reachable from any
/// authenticated or guest state; `Ready` is terminal whether or not the
/// sync step succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    ColdStart,
    LoadingLocal,
    Authenticated,
    Guest,
    Anonymous,
    Syncing,
    LoggingOut,
    Ready,
}

/// Store-backed state handed to the presentation layer after a load.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
    pub is_guest: bool,
    pub progress: ProgressState,
}

impl SessionSnapshot {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_guest: false,
            progress: ProgressState::default(),
        }
    }
}

/// Shallow merge: every top-level key of `patch` overwrites `base`. Used for
/// local guest patches and for overlaying the server's returned fields
/// (server wins on collision).
pub(crate) fn merge_object(base: &mut Value, patch: &Value) {
    if let (Value::Object(base), Value::Object(patch)) = (base, patch) {
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
    }
}
