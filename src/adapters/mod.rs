// src/adapters/mod.rs
//
// Source Adapters - one per backing store.
//
// Each adapter owns exactly one HTTP session to its store, translates
// the store's native record shape into the canonical model, and never
// shares state with other adapters. Connection *policy* (timeouts,
// retries, liveness) lives in the connection manager, not here.

pub mod movie_store;
pub mod series_store;

#[cfg(test)]
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalRecord, ConnectAck, PingInfo, SearchField, StatsFragment};
use crate::error::{ConnectError, QueryError};

pub use movie_store::MovieStoreAdapter;
pub use series_store::SeriesStoreAdapter;

/// Which catalog a source serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Movies,
    Series,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Movies => write!(f, "movies"),
            SourceKind::Series => write!(f, "series"),
        }
    }
}

/// Contract every backing store adapter satisfies.
///
/// The connection manager is the only caller of `connect`; the mediator
/// reaches adapters exclusively through the manager's live set. Deadlines
/// are imposed by the caller (`tokio::time::timeout`), so implementations
/// may block on I/O indefinitely without breaking the system's bounds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique source name (e.g. `"movies-db"`).
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Host the store is reached at, for health reporting.
    fn host(&self) -> &str;

    /// Establish the underlying link. Idempotent: calling while already
    /// connected is a no-op success and must not re-handshake.
    async fn connect(&self) -> Result<ConnectAck, ConnectError>;

    /// Search the store natively for `term` in `field`.
    ///
    /// Zero matches is an empty vec, not an error. Fails with
    /// [`QueryError::Unavailable`] when not connected. Records the
    /// normalizer cannot map are dropped with a warning rather than
    /// failing the batch.
    async fn search(
        &self,
        term: &str,
        field: SearchField,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>, QueryError>;

    /// Source-specific aggregate counters. The shape varies by kind;
    /// cross-kind aggregation is the mediator's job.
    async fn stats(&self) -> Result<StatsFragment, QueryError>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<PingInfo, QueryError>;
}
