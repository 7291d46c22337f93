use thiserror::Error;
use url::Url;

use crate::session::Phase;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("an unbound database handle needs an explicit database name")]
    MissingDatabaseName,
    #[error("handle is bound to database `{bound}` but changes were requested for `{requested}`")]
    DatabaseMismatch { bound: String, requested: String },
    #[error("the changes feed always runs continuously; `feed` cannot be overridden")]
    FeedOverride,
    #[error("the cursor is owned by the session; set `since` on the builder instead")]
    SinceOverride,
    #[error("cannot {operation} a changes feed that is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },
    #[error("failed to read the current update sequence: {0}")]
    Bootstrap(#[source] BindingError),
    #[error("failed to open the changes feed: {0}")]
    Request(#[source] BindingError),
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("`{url}` returned {status}")]
    Status {
        status: reqwest::StatusCode,
        url: Url,
    },
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("server URL `{0}` cannot carry a database path")]
    CannotBeABase(Url),
    #[error("no database name given and the handle is not bound")]
    NoDatabase,
    #[error("failed to parse database info: {0}")]
    InvalidInfo(#[source] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, Clone)]
#[error("cache invalidation failed: {message}")]
pub struct CacheError {
    pub message: String,
}

impl CacheError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
