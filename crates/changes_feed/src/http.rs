use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header::ACCEPT, Client, Method, Response};
use tracing::debug;
use url::Url;

use crate::{
    binding::{BodyStream, ChangesQuery, Database},
    change::DatabaseInfo,
    error::BindingError,
    reason::{TransportError, TransportErrorKind},
};

/// [`Database`] over CouchDB's HTTP API.
///
/// Credentials may be embedded in the server URL; they are never logged.
#[derive(Clone, Debug)]
pub struct CouchDatabase {
    client: Client,
    server: Url,
    db_name: Option<String>,
}

impl CouchDatabase {
    /// Unbound handle; the database is named per call.
    pub fn new(server: Url) -> Self {
        Self {
            client: Client::new(),
            server,
            db_name: None,
        }
    }

    pub fn parse(server: &str) -> Result<Self, BindingError> {
        Ok(Self::new(Url::parse(server)?))
    }

    pub fn bound(server: Url, db_name: impl Into<String>) -> Self {
        Self {
            db_name: Some(db_name.into()),
            ..Self::new(server)
        }
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers).
    ///
    /// Do not set a request timeout on it: the continuous feed stays open indefinitely.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server
    }

    fn database_url(&self, name: Option<&str>) -> Result<Url, BindingError> {
        let name = name
            .or(self.db_name.as_deref())
            .ok_or(BindingError::NoDatabase)?;
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| BindingError::CannotBeABase(redacted(&self.server)))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response, BindingError> {
        let response = self
            .client
            .request(method, url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BindingError::Status {
                status,
                url: redacted(&url),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Database for CouchDatabase {
    fn is_bound(&self) -> bool {
        self.db_name.is_some()
    }

    fn bound_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    async fn info(&self, name: Option<&str>) -> Result<DatabaseInfo, BindingError> {
        let url = self.database_url(name)?;
        debug!(path = url.path(), "fetching database info");
        let body = self.send(Method::GET, url).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(BindingError::InvalidInfo)
    }

    fn changes_url(&self, name: Option<&str>, query: &ChangesQuery) -> Result<Url, BindingError> {
        let mut url = self.database_url(name)?;
        url.path_segments_mut()
            .map_err(|_| BindingError::CannotBeABase(redacted(&self.server)))?
            .push("_changes");
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<BodyStream, BindingError> {
        let response = self.send(method, url).await?;
        Ok(response.bytes_stream().map_err(transport_error).boxed())
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::ConnectionLost
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::DataLoss
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.without_url().to_string())
}

fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    let _ = url.set_password(None);
    let _ = url.set_username("");
    url
}
