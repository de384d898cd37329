// src/adapters/stub.rs
//
// Scriptable in-memory adapter for unit tests. Counts every call so
// tests can assert cache hits and de-duplication, and can be told to
// fail, hang, or delay to exercise degraded paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::{SourceAdapter, SourceKind};
use crate::domain::{CanonicalRecord, ConnectAck, PingInfo, SearchField, StatsFragment};
use crate::error::{ConnectError, QueryError};

#[derive(Debug, Clone)]
pub enum ConnectBehavior {
    Succeed,
    Fail(ConnectError),
    /// Never resolves; the caller's timeout must fire.
    Hang,
}

pub struct StubAdapter {
    name: String,
    kind: SourceKind,
    records: Vec<CanonicalRecord>,
    stats: Option<StatsFragment>,
    connect_behavior: Mutex<ConnectBehavior>,
    search_failure: Mutex<Option<QueryError>>,
    search_delay: Mutex<Option<Duration>>,
    ping_failure: AtomicBool,
    connected: AtomicBool,

    pub connect_calls: AtomicUsize,
    /// Connect attempts that actually reached the handshake, i.e. did
    /// not take the already-connected early return.
    pub handshake_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
    pub ping_calls: AtomicUsize,
}

impl StubAdapter {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            records: Vec::new(),
            stats: None,
            connect_behavior: Mutex::new(ConnectBehavior::Succeed),
            search_failure: Mutex::new(None),
            search_delay: Mutex::new(None),
            ping_failure: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            handshake_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            stats_calls: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_records(mut self, records: Vec<CanonicalRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_stats(mut self, stats: StatsFragment) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_connect_behavior(self, behavior: ConnectBehavior) -> Self {
        *self.connect_behavior.lock().unwrap() = behavior;
        self
    }

    pub fn with_search_delay(self, delay: Duration) -> Self {
        *self.search_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        *self.connect_behavior.lock().unwrap() = behavior;
    }

    pub fn set_search_failure(&self, failure: Option<QueryError>) {
        *self.search_failure.lock().unwrap() = failure;
    }

    pub fn set_ping_failure(&self, fail: bool) {
        self.ping_failure.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn host(&self) -> &str {
        "stub.internal"
    }

    async fn connect(&self) -> Result<ConnectAck, ConnectError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        if self.connected.load(Ordering::SeqCst) {
            return Ok(ConnectAck {
                protocol_version: "stub/1".to_string(),
            });
        }

        self.handshake_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.connect_behavior.lock().unwrap().clone();
        match behavior {
            ConnectBehavior::Succeed => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(ConnectAck {
                    protocol_version: "stub/1".to_string(),
                })
            }
            ConnectBehavior::Fail(err) => Err(err),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }

    async fn search(
        &self,
        term: &str,
        _field: SearchField,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>, QueryError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.search_failure.lock().unwrap().clone() {
            return Err(failure);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let needle = term.to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|r| r.title().to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StatsFragment, QueryError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }
        self.stats.clone().ok_or(QueryError::Unavailable)
    }

    async fn ping(&self) -> Result<PingInfo, QueryError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected.load(Ordering::SeqCst) || self.ping_failure.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }
        Ok(PingInfo {
            latency: Duration::from_millis(5),
            protocol_version: "stub/1".to_string(),
        })
    }
}
