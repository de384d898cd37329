// src/adapters/movie_store.rs
//
// Movies store adapter - REST/JSON client.
//
// ARCHITECTURE:
// - Plain JSON-over-HTTP client for the movies store
// - Maps the store's native record shape → CanonicalRecord
// - Owns one HTTP session; connection policy lives in the manager
//
// The movies store reports scores on a 0-100 scale and uses its own
// field names (`name`, `release_year`, `category`, `directed_by`); all
// of that is normalized here so nothing upstream ever sees the native
// shape.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::warn;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::adapters::{SourceAdapter, SourceKind};
use crate::domain::{
    clamp_rating, normalize_text, CanonicalRecord, ConnectAck, PingInfo, SearchField,
    StatsFragment, UNKNOWN_YEAR,
};
use crate::error::{ConnectError, QueryError};
use async_trait::async_trait;

/// Handshake response
#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    protocol: String,
}

/// Native search response wrapper
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<NativeMovie>,
}

/// A movie in the store's native shape. Every field is optional on the
/// wire; absence is normalized, not rejected.
#[derive(Debug, Deserialize)]
struct NativeMovie {
    name: Option<String>,
    release_year: Option<i32>,
    category: Option<String>,
    /// 0-100 scale
    score: Option<f32>,
    directed_by: Option<String>,
}

/// Native stats response
#[derive(Debug, Deserialize)]
struct StatsResponse {
    movie_count: u64,
    /// 0-100 scale
    mean_score: f32,
    director_count: u64,
}

/// Movies store API client
pub struct MovieStoreAdapter {
    name: String,
    base_url: String,
    host: String,
    http_client: Client,
    connected: AtomicBool,
}

impl MovieStoreAdapter {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let host = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url,
            host,
            http_client,
            connected: AtomicBool::new(false),
        }
    }

    /// Map one native record, or drop it when it carries nothing usable.
    fn map_native(&self, native: NativeMovie) -> Option<CanonicalRecord> {
        if native.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
            warn!(
                "[{}] dropping record with no title: {:?}",
                self.name, native
            );
            return None;
        }

        Some(CanonicalRecord::Movie {
            title: normalize_text(native.name),
            year: native.release_year.unwrap_or(UNKNOWN_YEAR),
            genre: normalize_text(native.category),
            rating: clamp_rating(native.score.unwrap_or(0.0) / 10.0),
            director: normalize_text(native.directed_by),
        })
    }

    fn map_query_error(err: reqwest::Error) -> QueryError {
        if err.is_timeout() {
            QueryError::Timeout
        } else if err.is_decode() {
            QueryError::Malformed(err.to_string())
        } else {
            QueryError::Unavailable
        }
    }
}

#[async_trait]
impl SourceAdapter for MovieStoreAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Movies
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn connect(&self) -> Result<ConnectAck, ConnectError> {
        // Idempotent: an established session is not re-handshaken.
        if self.connected.load(Ordering::SeqCst) {
            return Ok(ConnectAck {
                protocol_version: "movies/1".to_string(),
            });
        }

        let response = self
            .http_client
            .get(format!("{}/api/v1/handshake", self.base_url))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectError::Timeout
                } else {
                    ConnectError::Refused(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ConnectError::Auth(response.status().to_string()));
            }
            status if !status.is_success() => {
                return Err(ConnectError::Refused(format!(
                    "handshake returned {}",
                    status
                )));
            }
            _ => {}
        }

        let handshake: HandshakeResponse = response
            .json()
            .await
            .map_err(|e| ConnectError::Refused(format!("bad handshake payload: {}", e)))?;

        self.connected.store(true, Ordering::SeqCst);
        Ok(ConnectAck {
            protocol_version: handshake.protocol,
        })
    }

    async fn search(
        &self,
        term: &str,
        field: SearchField,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>, QueryError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let response = self
            .http_client
            .get(format!("{}/api/v1/movies/search", self.base_url))
            .query(&[
                ("field", field.as_str()),
                ("q", term),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(Self::map_query_error)?;

        if !response.status().is_success() {
            return Err(QueryError::Malformed(format!(
                "search returned {}",
                response.status()
            )));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        Ok(payload
            .results
            .into_iter()
            .filter_map(|native| self.map_native(native))
            .collect())
    }

    async fn stats(&self) -> Result<StatsFragment, QueryError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let payload: StatsResponse = self
            .http_client
            .get(format!("{}/api/v1/stats", self.base_url))
            .send()
            .await
            .map_err(Self::map_query_error)?
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        Ok(StatsFragment::Movies {
            total_titles: payload.movie_count,
            average_rating: clamp_rating(payload.mean_score / 10.0),
            distinct_directors: payload.director_count,
        })
    }

    async fn ping(&self) -> Result<PingInfo, QueryError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let started = Instant::now();
        let payload: HandshakeResponse = self
            .http_client
            .get(format!("{}/api/v1/ping", self.base_url))
            .send()
            .await
            .map_err(Self::map_query_error)?
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        Ok(PingInfo {
            latency: started.elapsed(),
            protocol_version: payload.protocol,
        })
    }
}
