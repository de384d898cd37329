// src/connection/handle.rs
use tokio::time::Instant;

use crate::adapters::SourceKind;
use crate::domain::PingInfo;

/// Lifecycle of one source's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable bookkeeping for one registered source.
///
/// Owned exclusively by the connection manager; everything else reads
/// snapshots. `consecutive_failures` and `next_retry_at` drive the
/// reconnection sweep's exponential backoff.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    pub name: String,
    pub kind: SourceKind,
    pub host: String,
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub last_ping: Option<(PingInfo, Instant)>,
    pub protocol_version: Option<String>,
    pub consecutive_failures: u32,
    pub next_retry_at: Option<Instant>,
}

impl SourceHandle {
    pub fn new(name: String, kind: SourceKind, host: String) -> Self {
        Self {
            name,
            kind,
            host,
            state: ConnectionState::Disconnected,
            last_error: None,
            last_ping: None,
            protocol_version: None,
            consecutive_failures: 0,
            next_retry_at: None,
        }
    }
}
