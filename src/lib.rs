// src/lib.rs
// MediaHub - unified query mediator over movie and series catalog stores
//
// Architecture:
// - One canonical record model: adapters normalize, nothing upstream
//   ever sees a store's native shape
// - Degraded, never broken: a down source shrinks the result, it does
//   not fail the request
// - Event-driven at the edges: connection lifecycle and cache churn are
//   observable without polling
// - Explicit: one AppState built at process start, torn down explicitly

pub mod adapters;
pub mod application;
pub mod cache;
pub mod connection;
pub mod domain;
pub mod error;
pub mod events;
pub mod services;

// ============================================================================
// PUBLIC API - Global Schema View
// ============================================================================

pub use domain::{
    clamp_rating,
    normalize_text,
    CanonicalRecord,
    ConnectAck,
    HealthReport,
    HealthState,
    HealthStatus,
    MediationResult,
    PingInfo,
    SearchField,
    SearchRequest,
    StatsFragment,
    StatsReport,
    UNKNOWN,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult, ConnectError, QueryError};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    create_event_bus,
    CacheInvalidated,
    DomainEvent,
    EventBus,
    EventLogEntry,
    SearchExecuted,
    SourceConnected,
    SourceDisconnected,
};

// ============================================================================
// PUBLIC API - Adapters
// ============================================================================

pub use adapters::{MovieStoreAdapter, SeriesStoreAdapter, SourceAdapter, SourceKind};

// ============================================================================
// PUBLIC API - Connection Management
// ============================================================================

pub use connection::{ConnectionManager, ConnectionState, SourceHandle};

// ============================================================================
// PUBLIC API - Cache
// ============================================================================

pub use cache::Cache;

// ============================================================================
// PUBLIC API - Mediator Service
// ============================================================================

pub use services::MediatorService;

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::{AppState, MediatorConfig};
