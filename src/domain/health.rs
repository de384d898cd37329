// src/domain/health.rs
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Acknowledgement from a successful adapter handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAck {
    pub protocol_version: String,
}

/// Result of a lightweight liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingInfo {
    pub latency: Duration,
    pub protocol_version: String,
}

/// Reported liveness of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Link up, last probe answered.
    Connected,
    /// Link nominally up but the latest probe failed.
    Degraded,
    Disconnected,
}

/// Per-source health as exposed to the presentation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub host: String,
    pub last_ping_latency_ms: Option<u64>,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Health keyed by source name.
pub type HealthReport = BTreeMap<String, HealthStatus>;
