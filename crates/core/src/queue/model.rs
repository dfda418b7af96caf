//! Queued operation models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deferred backend mutation, serialized as `{"type": ..., "payload": ...}`.
/// Operations must be additive and order-independent so a lost update between
/// two interleaved writers degrades gracefully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Additive XP credit that failed to reach `POST /xp/add`.
    #[serde(rename_all = "camelCase")]
    SyncXp { amount: u64, source: String },
}

impl OperationKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SyncXp { .. } => "SYNC_XP",
        }
    }
}

/// One entry of the pending-operation log. Consumed only after a confirmed
/// replay; never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: OperationKind,
    pub queued_at: DateTime<Utc>,
}

impl QueuedOperation {
    pub fn new(kind: OperationKind, queued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            queued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_wire_shape() {
        let op = QueuedOperation::new(
            OperationKind::SyncXp {
                amount: 50,
                source: "quiz".to_string(),
            },
            Utc::now(),
        );
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "SYNC_XP");
        assert_eq!(value["payload"]["amount"], 50);
        assert_eq!(value["payload"]["source"], "quiz");

        let back: QueuedOperation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }
}
