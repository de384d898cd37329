// src/events/types.rs
//
// All mediator events. Each event is an immutable fact that has
// already occurred; subscribers react, they cannot veto.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait that all mediator events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

// ============================================================================
// CONNECTION LIFECYCLE EVENTS
// ============================================================================

/// Emitted when a source reaches Connected, at bootstrap or after a
/// successful reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConnected {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source_name: String,
    pub protocol_version: String,
}

impl SourceConnected {
    pub fn new(source_name: String, protocol_version: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source_name,
            protocol_version,
        }
    }
}

impl DomainEvent for SourceConnected {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "SourceConnected" }
}

/// Emitted when a Connected source is observed dead mid-session and
/// demoted out of the live set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDisconnected {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source_name: String,
    pub error: String,
}

impl SourceDisconnected {
    pub fn new(source_name: String, error: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source_name,
            error,
        }
    }
}

impl DomainEvent for SourceDisconnected {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "SourceDisconnected" }
}

// ============================================================================
// QUERY EVENTS
// ============================================================================

/// Emitted once per real fan-out (cache hits do not emit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchExecuted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub term: String,
    pub sources_queried: usize,
    pub sources_succeeded: usize,
}

impl SearchExecuted {
    pub fn new(term: String, sources_queried: usize, sources_succeeded: usize) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            term,
            sources_queried,
            sources_succeeded,
        }
    }
}

impl DomainEvent for SearchExecuted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "SearchExecuted" }
}

/// Emitted when the presentation client forces a cache refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInvalidated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub scope: String,
}

impl CacheInvalidated {
    pub fn new(scope: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            scope,
        }
    }
}

impl DomainEvent for CacheInvalidated {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "CacheInvalidated" }
}
