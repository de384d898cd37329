// src/connection/manager.rs
//
// Connection Manager - owns the adapter set and every SourceHandle.
//
// DESIGN PRINCIPLES:
// 1. Bootstrap is concurrent - one stalled source never serializes
//    startup onto the slowest link
// 2. Failures are isolated - zero live sources is a degraded state,
//    not an error
// 3. Handles are mutated here and nowhere else; the mediator reads
//    snapshots through live_adapters/health_snapshot

use std::sync::{Arc, RwLock};

use log::{info, warn};
use tokio::time::Instant;
use tokio::task::JoinSet;

use crate::adapters::{SourceAdapter, SourceKind};
use crate::application::MediatorConfig;
use crate::connection::handle::{ConnectionState, SourceHandle};
use crate::domain::{HealthReport, HealthState, HealthStatus};
use crate::events::{EventBus, SourceConnected, SourceDisconnected};

struct ManagedSource {
    adapter: Arc<dyn SourceAdapter>,
    handle: RwLock<SourceHandle>,
}

pub struct ConnectionManager {
    sources: Vec<Arc<ManagedSource>>,
    config: MediatorConfig,
    event_bus: EventBus,
}

impl ConnectionManager {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        config: MediatorConfig,
        event_bus: EventBus,
    ) -> Self {
        let sources = adapters
            .into_iter()
            .map(|adapter| {
                let handle = SourceHandle::new(
                    adapter.name().to_string(),
                    adapter.kind(),
                    adapter.host().to_string(),
                );
                Arc::new(ManagedSource {
                    adapter,
                    handle: RwLock::new(handle),
                })
            })
            .collect();

        Self {
            sources,
            config,
            event_bus,
        }
    }

    /// Connect every registered adapter concurrently. Each adapter's
    /// failure is isolated; the call never fails wholesale. Returns the
    /// number of adapters that reached Connected within the per-adapter
    /// timeout.
    pub async fn initialize_all(&self) -> usize {
        let mut tasks = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let timeout = self.config.connect_timeout();
            let bus = self.event_bus.clone();
            let backoff = self.config.backoff_for(1);
            tasks.spawn(async move {
                Self::attempt_connect(&source, timeout, &bus, backoff).await
            });
        }

        let mut connected = 0;
        while let Some(result) = tasks.join_next().await {
            if matches!(result, Ok(true)) {
                connected += 1;
            }
        }

        info!(
            "bootstrap complete: {}/{} sources connected",
            connected,
            self.sources.len()
        );
        connected
    }

    /// One bounded connect attempt against one source, recording the
    /// outcome on its handle. Used by bootstrap and the reconnect sweep.
    async fn attempt_connect(
        source: &ManagedSource,
        timeout: std::time::Duration,
        bus: &EventBus,
        backoff_on_failure: std::time::Duration,
    ) -> bool {
        {
            let mut handle = source.handle.write().unwrap();
            handle.state = ConnectionState::Connecting;
        }

        let outcome = tokio::time::timeout(timeout, source.adapter.connect()).await;

        // The handle lock is released before emitting so a subscriber
        // may call back into the manager.
        let connected_event = {
            let mut handle = source.handle.write().unwrap();
            match outcome {
                Ok(Ok(ack)) => {
                    handle.state = ConnectionState::Connected;
                    handle.last_error = None;
                    handle.consecutive_failures = 0;
                    handle.next_retry_at = None;
                    handle.protocol_version = Some(ack.protocol_version.clone());
                    info!("source {} connected ({})", handle.name, ack.protocol_version);
                    Some(SourceConnected::new(handle.name.clone(), ack.protocol_version))
                }
                Ok(Err(err)) => {
                    handle.state = ConnectionState::Failed;
                    handle.last_error = Some(err.to_string());
                    handle.consecutive_failures += 1;
                    handle.next_retry_at = Some(Instant::now() + backoff_on_failure);
                    warn!("source {} failed to connect: {}", handle.name, err);
                    None
                }
                Err(_) => {
                    handle.state = ConnectionState::Failed;
                    handle.last_error = Some("connection attempt timed out".to_string());
                    handle.consecutive_failures += 1;
                    handle.next_retry_at = Some(Instant::now() + backoff_on_failure);
                    warn!("source {} connect timed out", handle.name);
                    None
                }
            }
        };

        match connected_event {
            Some(event) => {
                bus.emit(event);
                true
            }
            None => false,
        }
    }

    /// Adapters currently Connected, optionally restricted to one kind.
    /// Consulted before every fan-out so a source that died mid-session
    /// is skipped instead of failing the query.
    pub fn live_adapters(&self, kind: Option<SourceKind>) -> Vec<(String, Arc<dyn SourceAdapter>)> {
        self.sources
            .iter()
            .filter(|source| {
                let handle = source.handle.read().unwrap();
                handle.state == ConnectionState::Connected
                    && kind.map(|k| handle.kind == k).unwrap_or(true)
            })
            .map(|source| {
                (
                    source.adapter.name().to_string(),
                    Arc::clone(&source.adapter),
                )
            })
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.handle.read().unwrap().state == ConnectionState::Connected)
            .count()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Snapshot of every registered handle.
    pub fn handles(&self) -> Vec<SourceHandle> {
        self.sources
            .iter()
            .map(|s| s.handle.read().unwrap().clone())
            .collect()
    }

    /// Demote a source observed dead mid-session (e.g. a fan-out call
    /// came back Unavailable). The reconnect sweep picks it up.
    pub fn mark_disconnected(&self, name: &str, error: &str) {
        for source in &self.sources {
            let demoted = {
                let mut handle = source.handle.write().unwrap();
                if handle.name == name && handle.state == ConnectionState::Connected {
                    handle.state = ConnectionState::Disconnected;
                    handle.last_error = Some(error.to_string());
                    true
                } else {
                    false
                }
            };
            if demoted {
                warn!("source {} marked disconnected: {}", name, error);
                self.event_bus
                    .emit(SourceDisconnected::new(name.to_string(), error.to_string()));
            }
        }
    }

    /// Current health of every source. A Connected source whose cached
    /// ping is older than `ping_max_age` is probed fresh, bounding how
    /// stale a health report can get without pinging on every refresh.
    pub async fn health_snapshot(&self) -> HealthReport {
        let mut report = HealthReport::new();

        for source in &self.sources {
            let (name, host, state, last_error, version, cached_ping) = {
                let handle = source.handle.read().unwrap();
                (
                    handle.name.clone(),
                    handle.host.clone(),
                    handle.state,
                    handle.last_error.clone(),
                    handle.protocol_version.clone(),
                    handle.last_ping.clone(),
                )
            };

            let status = match state {
                ConnectionState::Connected => {
                    let fresh_enough = cached_ping
                        .as_ref()
                        .map(|(_, at)| at.elapsed() < self.config.ping_max_age())
                        .unwrap_or(false);

                    if fresh_enough {
                        let (ping, _) = cached_ping.unwrap();
                        HealthStatus {
                            status: HealthState::Connected,
                            host,
                            last_ping_latency_ms: Some(ping.latency.as_millis() as u64),
                            version,
                            error: None,
                        }
                    } else {
                        let probe = tokio::time::timeout(
                            self.config.query_timeout(),
                            source.adapter.ping(),
                        )
                        .await;

                        match probe {
                            Ok(Ok(ping)) => {
                                let mut handle = source.handle.write().unwrap();
                                handle.last_ping = Some((ping.clone(), Instant::now()));
                                handle.protocol_version = Some(ping.protocol_version.clone());
                                HealthStatus {
                                    status: HealthState::Connected,
                                    host,
                                    last_ping_latency_ms: Some(ping.latency.as_millis() as u64),
                                    version: Some(ping.protocol_version),
                                    error: None,
                                }
                            }
                            Ok(Err(err)) => HealthStatus {
                                status: HealthState::Degraded,
                                host,
                                last_ping_latency_ms: None,
                                version,
                                error: Some(err.to_string()),
                            },
                            Err(_) => HealthStatus {
                                status: HealthState::Degraded,
                                host,
                                last_ping_latency_ms: None,
                                version,
                                error: Some("ping timed out".to_string()),
                            },
                        }
                    }
                }
                _ => HealthStatus {
                    status: HealthState::Disconnected,
                    host,
                    last_ping_latency_ms: None,
                    version,
                    error: last_error,
                },
            };

            report.insert(name, status);
        }

        report
    }

    /// Background sweep retrying connect on Failed/Disconnected sources
    /// with exponential backoff. Runs until the returned handle is
    /// aborted (see `AppState::shutdown`).
    pub fn spawn_reconnect_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.config.sweep_interval());
            // The first tick fires immediately; skip it so a fresh
            // bootstrap failure is not retried before its backoff.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                manager.sweep_once().await;
            }
        })
    }

    async fn sweep_once(&self) {
        for source in &self.sources {
            let (eligible, failures) = {
                let handle = source.handle.read().unwrap();
                let down = matches!(
                    handle.state,
                    ConnectionState::Failed | ConnectionState::Disconnected
                );
                let due = handle
                    .next_retry_at
                    .map(|at| Instant::now() >= at)
                    .unwrap_or(true);
                (down && due, handle.consecutive_failures)
            };

            if eligible {
                let backoff = self.config.backoff_for(failures + 1);
                Self::attempt_connect(
                    source,
                    self.config.connect_timeout(),
                    &self.event_bus,
                    backoff,
                )
                .await;
            }
        }
    }
}
