// src/application/config.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every tunable of the mediation layer, with the documented defaults.
/// Millisecond fields keep the struct trivially (de)serializable so a
/// host can load it from its own config file or construct it in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Per-adapter bound on `connect` during bootstrap and reconnects.
    pub connect_timeout_ms: u64,
    /// Per-adapter bound on `search`/`stats` during a fan-out.
    pub query_timeout_ms: u64,
    /// Slack granted past the per-adapter deadline before the whole
    /// fan-out is cut off and stragglers counted as timeouts.
    pub fanout_grace_ms: u64,
    /// Upper bound passed to adapter `search`; predicate filtering is
    /// post-merge, so adapters are asked for more than `limit`.
    pub fetch_limit: usize,
    pub search_ttl_ms: u64,
    pub stats_ttl_ms: u64,
    pub health_ttl_ms: u64,
    /// A cached ping older than this is refreshed during a health
    /// snapshot.
    pub ping_max_age_ms: u64,
    /// Interval of the background reconnection sweep.
    pub sweep_interval_ms: u64,
    /// Exponential backoff base for reconnect attempts.
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            query_timeout_ms: 5_000,
            fanout_grace_ms: 500,
            fetch_limit: 200,
            search_ttl_ms: 30_000,
            stats_ttl_ms: 60_000,
            health_ttl_ms: 30_000,
            ping_max_age_ms: 30_000,
            sweep_interval_ms: 60_000,
            backoff_base_ms: 2_000,
            backoff_cap_ms: 60_000,
        }
    }
}

impl MediatorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn fanout_deadline(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms + self.fanout_grace_ms)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_millis(self.search_ttl_ms)
    }

    pub fn stats_ttl(&self) -> Duration {
        Duration::from_millis(self.stats_ttl_ms)
    }

    pub fn health_ttl(&self) -> Duration {
        Duration::from_millis(self.health_ttl_ms)
    }

    pub fn ping_max_age(&self) -> Duration {
        Duration::from_millis(self.ping_max_age_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Backoff before the next reconnect attempt after `failures`
    /// consecutive failures: `base * 2^(failures-1)`, capped.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exp = failures.saturating_sub(1).min(16);
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_cap_ms);
        Duration::from_millis(ms)
    }
}
