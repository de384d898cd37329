// src/events/mod.rs
//
// Internal Event System - Public API
//
// CRITICAL: EventHandler is INTERNAL and must NOT be exported

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventLogEntry};
pub use types::{
    CacheInvalidated, DomainEvent, SearchExecuted, SourceConnected, SourceDisconnected,
};

/// Initialize a new event bus
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}
