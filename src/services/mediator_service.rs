// src/services/mediator_service.rs
//
// Query Mediator - the orchestration core.
//
// Per request:
//   Received → CacheCheck → {hit → truncate → Done}
//                         | {miss → FanOut → Merge → Filter → CacheStore
//                            → truncate → Done}
//
// A backing source in trouble degrades the result (recorded error,
// missing by_source key); it never fails the request. The only outright
// failure is a malformed request.

use std::collections::HashSet;
use std::sync::Arc;

use log::warn;
use tokio::task::JoinSet;

use crate::adapters::SourceKind;
use crate::application::MediatorConfig;
use crate::cache::Cache;
use crate::connection::ConnectionManager;
use crate::domain::{
    HealthReport, MediationResult, SearchRequest, StatsFragment, StatsReport,
};
use crate::error::{AppResult, QueryError};
use crate::events::{CacheInvalidated, EventBus, SearchExecuted};

pub struct MediatorService {
    connections: Arc<ConnectionManager>,
    config: MediatorConfig,
    event_bus: EventBus,
    search_cache: Cache<MediationResult>,
    stats_cache: Cache<StatsReport>,
    health_cache: Cache<HealthReport>,
}

impl MediatorService {
    pub fn new(
        connections: Arc<ConnectionManager>,
        config: MediatorConfig,
        event_bus: EventBus,
    ) -> Self {
        let search_cache = Cache::new(config.search_ttl());
        let stats_cache = Cache::new(config.stats_ttl());
        let health_cache = Cache::new(config.health_ttl());
        Self {
            connections,
            config,
            event_bus,
            search_cache,
            stats_cache,
            health_cache,
        }
    }

    /// Bootstrap every registered source concurrently. Returns the
    /// number that came up; zero is a degraded state, not an error.
    pub async fn initialize(&self) -> usize {
        self.connections.initialize_all().await
    }

    /// Execute a logical search across both catalogs.
    ///
    /// The cached value is the pre-truncation merge (the cache key
    /// excludes `limit`), so requests differing only in limit share one
    /// fan-out and are cut to size per caller.
    pub async fn search(&self, request: &SearchRequest) -> AppResult<MediationResult> {
        request.validate()?;

        let key = request.cache_key();
        let merged = self
            .search_cache
            .get_or_compute(&key, || self.execute_search(request))
            .await?;

        Ok(merged.truncated(request.limit))
    }

    /// Aggregate statistics across all live sources.
    pub async fn stats(&self) -> AppResult<StatsReport> {
        self.stats_cache
            .get_or_compute("stats", || self.execute_stats())
            .await
    }

    /// Per-source health, served from cache within its TTL.
    pub async fn health_check(&self) -> AppResult<HealthReport> {
        self.health_cache
            .get_or_compute("health", || async {
                Ok(self.connections.health_snapshot().await)
            })
            .await
    }

    /// Drop every cached search, stats and health entry. The next call
    /// of each kind goes back to the sources.
    pub fn refresh_cache(&self) {
        self.search_cache.invalidate_all();
        self.stats_cache.invalidate_all();
        self.health_cache.invalidate_all();
        self.event_bus.emit(CacheInvalidated::new("all".to_string()));
    }

    // ========================================================================
    // INTERNAL: fan-out execution
    // ========================================================================

    /// Live adapters for the kinds the request includes. A source that
    /// died mid-session is simply absent here.
    fn select_targets(&self, request: &SearchRequest) -> Vec<(String, Arc<dyn crate::adapters::SourceAdapter>)> {
        let mut targets = Vec::new();
        if request.include_movies {
            targets.extend(self.connections.live_adapters(Some(SourceKind::Movies)));
        }
        if request.include_series {
            targets.extend(self.connections.live_adapters(Some(SourceKind::Series)));
        }
        targets
    }

    async fn execute_search(&self, request: &SearchRequest) -> AppResult<MediationResult> {
        let targets = self.select_targets(request);

        let mut result = MediationResult::empty();
        result.sources_queried = targets.len();

        let mut pending: HashSet<String> = targets.iter().map(|(name, _)| name.clone()).collect();

        let mut tasks = JoinSet::new();
        for (name, adapter) in targets {
            let term = request.term.clone();
            let field = request.field;
            let fetch_limit = self.config.fetch_limit;
            let timeout = self.config.query_timeout();
            tasks.spawn(async move {
                let outcome =
                    match tokio::time::timeout(timeout, adapter.search(&term, field, fetch_limit))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(QueryError::Timeout),
                    };
                (name, outcome)
            });
        }

        // Individual calls are already deadline-bounded; the overall
        // deadline only catches scheduling stalls. On expiry the request
        // returns whatever completed, stragglers counted as timeouts.
        let deadline = tokio::time::Instant::now() + self.config.fanout_deadline();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((name, outcome)))) => {
                    pending.remove(&name);
                    match outcome {
                        Ok(records) => {
                            result.sources_succeeded += 1;
                            let kept: Vec<_> = records
                                .into_iter()
                                .filter(|record| request.matches(record))
                                .collect();
                            result.by_source.insert(name, kept);
                        }
                        Err(err) => {
                            warn!("search against {} failed: {}", name, err);
                            if err == QueryError::Unavailable {
                                self.connections.mark_disconnected(&name, &err.to_string());
                            }
                            result.errors.insert(name, err.to_string());
                        }
                    }
                }
                Ok(Some(Err(join_err))) => {
                    warn!("search task failed to complete: {}", join_err);
                }
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    for name in pending.drain() {
                        warn!("search against {} cut off at fan-out deadline", name);
                        result.errors.insert(name, QueryError::Timeout.to_string());
                    }
                    break;
                }
            }
        }

        result.total_count = result.by_source.values().map(Vec::len).sum();

        self.event_bus.emit(SearchExecuted::new(
            request.term.clone(),
            result.sources_queried,
            result.sources_succeeded,
        ));

        Ok(result)
    }

    async fn execute_stats(&self) -> AppResult<StatsReport> {
        let targets = self.connections.live_adapters(None);

        let mut report = StatsReport::empty();
        report.sources_queried = targets.len();

        let mut tasks = JoinSet::new();
        for (name, adapter) in targets {
            let timeout = self.config.query_timeout();
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, adapter.stats()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(QueryError::Timeout),
                };
                (name, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((name, outcome)) = joined else {
                warn!("stats task failed to complete");
                continue;
            };
            match outcome {
                Ok(fragment) => {
                    report.sources_succeeded += 1;
                    match fragment {
                        StatsFragment::Movies { .. } => {
                            report.movies = Some(match report.movies.take() {
                                Some(existing) => existing.merge(fragment),
                                None => fragment,
                            });
                        }
                        StatsFragment::Series { .. } => {
                            report.series = Some(match report.series.take() {
                                Some(existing) => existing.merge(fragment),
                                None => fragment,
                            });
                        }
                    }
                }
                Err(err) => {
                    warn!("stats against {} failed: {}", name, err);
                    if err == QueryError::Unavailable {
                        self.connections.mark_disconnected(&name, &err.to_string());
                    }
                    report.errors.insert(name, err.to_string());
                }
            }
        }

        Ok(report)
    }
}
