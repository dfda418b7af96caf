//! Local key-value store contract and well-known keys.
//!
//! Every durable piece of client state lives under one of these keys. Keys
//! are updated independently; there is no multi-key transaction, so readers
//! must tolerate partially written state by re-deriving on the next load.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{Error, Result};

/// Well-known persisted keys.
pub mod keys {
    /// Serialized [`crate::session::UserProfile`].
    pub const USER: &str = "user_data";
    /// Bearer token for authenticated API calls.
    pub const AUTH_TOKEN: &str = "auth_token";
    /// `"true"` when the session was entered in guest mode.
    pub const GUEST_FLAG: &str = "is_guest";
    /// Total XP as a decimal string.
    pub const XP: &str = "user_xp";
    /// Display-only level; never trusted as an input, always recomputed.
    pub const LEVEL: &str = "user_level";
    /// Consecutive-day streak as a decimal string.
    pub const STREAK: &str = "user_streak";
    /// Last login date, `YYYY-MM-DD`.
    pub const LAST_LOGIN_DATE: &str = "last_login_date";
    /// Serialized [`crate::classes::ClassSelection`].
    pub const SELECTED_CLASS: &str = "selected_class";
    /// Serialized FIFO list of [`crate::queue::QueuedOperation`].
    pub const PENDING_OPERATIONS: &str = "pending_operations";
    /// Serialized list of [`crate::wellbeing::DailyScreenTime`].
    pub const SCREEN_TIME_DATA: &str = "screen_time_data";
    /// Serialized [`crate::wellbeing::ActiveSession`] marker.
    pub const CURRENT_SESSION: &str = "current_screen_session";
}

/// Durable on-device key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Absent keys read back as `None`; that is "no data yet", not an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value. Absent keys, storage failures, and decode
/// failures all read as `None` so a corrupt entry cannot wedge a cold start;
/// failures are logged.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(value) => value?,
        Err(err) => {
            warn!("store read failed for '{}': {}", key, err);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("discarding undecodable entry for '{}': {}", key, err);
            None
        }
    }
}

/// Encode and write a JSON value under `key`.
pub async fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// In-memory store for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::storage("store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::storage("store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::storage("store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_json_reads_as_absent() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "{not json").await.unwrap();
        let value: Option<Vec<u32>> = get_json(&store, "k").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn json_helpers_roundtrip() {
        let store = MemoryKeyValueStore::new();
        set_json(&store, "k", &vec![1u32, 2, 3]).await.unwrap();
        let value: Option<Vec<u32>> = get_json(&store, "k").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
