//! The seam between the feed session and the database client.
//!
//! The session never builds URLs or talks HTTP itself; it asks a [`Database`]
//! for the current update sequence, for the `_changes` URL and for a streaming
//! response body. [`CouchDatabase`](crate::CouchDatabase) is the HTTP
//! implementation; tests substitute in-memory ones.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::Method;
use url::Url;

use crate::change::{DatabaseInfo, Seq};
use crate::error::BindingError;
use crate::reason::TransportError;

/// Response body of a streaming request. Dropping it stops delivery.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FeedMode {
    #[default]
    Normal,
    Longpoll,
    Continuous,
}

impl FeedMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedMode::Normal => "normal",
            FeedMode::Longpoll => "longpoll",
            FeedMode::Continuous => "continuous",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangesQuery {
    pub feed: FeedMode,
    pub since: Option<Seq>,
    /// Additional `_changes` parameters, in order.
    pub params: Vec<(String, String)>,
}

impl ChangesQuery {
    pub fn continuous(since: Option<Seq>) -> Self {
        Self {
            feed: FeedMode::Continuous,
            since,
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// `feed`, then `since` when set, then the extra parameters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 2);
        pairs.push(("feed".to_string(), self.feed.as_str().to_string()));
        if let Some(since) = &self.since {
            pairs.push(("since".to_string(), since.to_string()));
        }
        pairs.extend(self.params.iter().cloned());
        pairs
    }
}

/// A handle on a document database server, optionally bound to one database.
///
/// `name` arguments select the database when the handle is unbound; bound
/// handles receive `None` and use their own database.
#[async_trait]
pub trait Database: Send + Sync {
    fn is_bound(&self) -> bool;

    /// Name of the bound database, if any.
    fn bound_name(&self) -> Option<&str>;

    async fn info(&self, name: Option<&str>) -> Result<DatabaseInfo, BindingError>;

    fn changes_url(&self, name: Option<&str>, query: &ChangesQuery) -> Result<Url, BindingError>;

    /// Issues `method` against `url` and returns the body as it arrives.
    async fn request(&self, method: Method, url: Url) -> Result<BodyStream, BindingError>;
}
