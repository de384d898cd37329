// src/adapters/series_store.rs
//
// Series store adapter - RPC-style JSON client.
//
// ARCHITECTURE:
// - The series store speaks a single-endpoint RPC dialect: every call is
//   a POST to /rpc with a method name and params, answering with an
//   envelope `{ ok, error?, ... }`
// - Maps the store's native show shape → CanonicalRecord
// - Ratings are already on the canonical 0-10 scale but are clamped
//   anyway; the link is untrusted

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::warn;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::{SourceAdapter, SourceKind};
use crate::domain::{
    clamp_rating, normalize_text, CanonicalRecord, ConnectAck, PingInfo, SearchField,
    StatsFragment,
};
use crate::error::{ConnectError, QueryError};
use async_trait::async_trait;

/// RPC envelope wrapping every response. Body fields sit beside `ok`
/// and are parsed in a second step once the envelope is known good.
#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: serde_json::Value,
}

impl RpcEnvelope {
    fn into_body<T>(self) -> Result<T, String>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.ok {
            return Err(self.error.unwrap_or_else(|| "rpc error".to_string()));
        }
        serde_json::from_value(self.body).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct HelloBody {
    protocol: String,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    shows: Vec<NativeShow>,
}

/// A show in the store's native shape
#[derive(Debug, Deserialize)]
struct NativeShow {
    title: Option<String>,
    season_count: Option<u32>,
    genre: Option<String>,
    /// Already 0-10
    rating: Option<f32>,
    network: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsBody {
    show_count: u64,
    avg_rating: f32,
    season_total: u64,
}

/// Series store API client
pub struct SeriesStoreAdapter {
    name: String,
    base_url: String,
    host: String,
    http_client: Client,
    connected: AtomicBool,
}

impl SeriesStoreAdapter {
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

    fn map_native(&self, native: NativeShow) -> Option<CanonicalRecord> {
        if native.title.as_deref().map(str::trim).unwrap_or("").is_empty() {
            warn!("[{}] dropping show with no title: {:?}", self.name, native);
            return None;
        }

        Some(CanonicalRecord::Series {
            title: normalize_text(native.title),
            seasons: native.season_count.unwrap_or(0),
            genre: normalize_text(native.genre),
            rating: clamp_rating(native.rating.unwrap_or(0.0)),
            network: normalize_text(native.network),
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

    /// Execute one RPC call and unwrap the envelope.
    async fn call<T>(&self, method: &str, params: serde_json::Value) -> Result<T, QueryError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http_client
            .post(format!("{}/rpc", self.base_url))
            .json(&json!({ "method": method, "params": params }))
            .send()
            .await
            .map_err(Self::map_query_error)?;

        if !response.status().is_success() {
            return Err(QueryError::Malformed(format!(
                "{} returned {}",
                method,
                response.status()
            )));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        envelope.into_body().map_err(QueryError::Malformed)
    }
}

#[async_trait]
impl SourceAdapter for SeriesStoreAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Series
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn connect(&self) -> Result<ConnectAck, ConnectError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(ConnectAck {
                protocol_version: "series/2".to_string(),
            });
        }

        let response = self
            .http_client
            .post(format!("{}/rpc", self.base_url))
            .json(&json!({ "method": "catalog.hello", "params": {} }))
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
                return Err(ConnectError::Refused(format!("hello returned {}", status)));
            }
            _ => {}
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ConnectError::Refused(format!("bad hello payload: {}", e)))?;

        let hello: HelloBody = envelope
            .into_body()
            .map_err(|e| ConnectError::Refused(format!("hello rejected: {}", e)))?;

        self.connected.store(true, Ordering::SeqCst);
        Ok(ConnectAck {
            protocol_version: hello.protocol,
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

        let body: SearchBody = self
            .call(
                "catalog.search",
                json!({ "field": field.as_str(), "term": term, "max": limit }),
            )
            .await?;

        Ok(body
            .shows
            .into_iter()
            .filter_map(|native| self.map_native(native))
            .collect())
    }

    async fn stats(&self) -> Result<StatsFragment, QueryError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let body: StatsBody = self.call("catalog.stats", json!({})).await?;

        Ok(StatsFragment::Series {
            total_titles: body.show_count,
            average_rating: clamp_rating(body.avg_rating),
            total_seasons: body.season_total,
        })
    }

    async fn ping(&self) -> Result<PingInfo, QueryError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable);
        }

        let started = Instant::now();
        let body: HelloBody = self.call("catalog.ping", json!({})).await?;

        Ok(PingInfo {
            latency: started.elapsed(),
            protocol_version: body.protocol,
        })
    }
}
