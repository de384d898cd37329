// src/error/types.rs
use serde::Serialize;
use thiserror::Error;

/// Errors from a single adapter's connection attempt.
/// Fatal only to that attempt; the reconnection sweep retries later.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error("connection refused: {0}")]
    Refused(String),

    #[error("authentication rejected: {0}")]
    Auth(String),
}

/// Errors from a single adapter's query-path call (search/stats/ping).
/// Captured per source and attached to the result; never raised to the
/// mediator's caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query exceeded deadline")]
    Timeout,

    #[error("source not connected")]
    Unavailable,

    #[error("source returned unmappable data: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Other(format!("HTTP error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
