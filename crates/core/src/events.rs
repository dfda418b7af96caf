//! Domain events emitted by the sync core after local mutations.
//!
//! The presentation layer subscribes through a [`DomainEventSink`]; services
//! never import each other's modules to signal these.

use serde::{Deserialize, Serialize};

/// Events the core raises for its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// The recomputed level exceeded the previous one after an XP credit.
    LevelUp { new_level: u32 },
    /// The daily streak rollover changed the streak value.
    StreakRolled { streak: u32 },
    /// All session-scoped keys were cleared by the auth fail-safe.
    SessionCleared,
}

/// Sink for domain events raised after local mutations.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Sink that drops every event; the default for hosts that do not subscribe.
#[derive(Debug, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}
