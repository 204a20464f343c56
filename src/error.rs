//! Error taxonomy for the alerting engine
//!
//! Every variant here is recoverable: fetch failures skip a symbol, persistence
//! failures degrade to empty or stale state, and statistics errors mean "no
//! signal". Nothing in this module is allowed to end a sweep.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Market-data failure for one symbol or one listing call
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Durable state read/write failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Statistics outcomes that carry no signal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("insufficient data")]
    InsufficientData,

    #[error("previous close is zero")]
    DivisionByZero,

    #[error("invalid indicator period: {0}")]
    InvalidPeriod(usize),

    #[error("invalid indicator multiplier")]
    InvalidMultiplier,
}

/// Notification delivery failure
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification API error {status}: {body}")]
    Api { status: u16, body: String },
}

pub type FetchResult<T> = Result<T, FetchError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;
