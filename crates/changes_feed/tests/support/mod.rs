#![allow(dead_code)]

use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use changes_feed::{
    BindingError, BodyStream, CacheError, Change, ChangeCache, ChangeListener, ChangesQuery,
    CloseReason, Database, DatabaseInfo, Seq, TransportError,
};
use futures::{channel::mpsc, StreamExt};
use reqwest::Method;
use tokio::sync::Notify;
use url::Url;

type Chunk = Result<Bytes, TransportError>;

/// In-memory database whose single `_changes` body is driven by a [`FeedHandle`].
pub struct FakeDatabase {
    bound: Option<String>,
    update_seq: Seq,
    fail_info: bool,
    info_gate: Option<Arc<Notify>>,
    body: Mutex<Option<mpsc::UnboundedReceiver<Chunk>>>,
    info_calls: Mutex<Vec<Option<String>>>,
    requests: Mutex<Vec<Url>>,
}

pub struct FeedHandle {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl FakeDatabase {
    pub fn bound(name: &str) -> (Self, FeedHandle) {
        Self::with_binding(Some(name.to_string()))
    }

    pub fn unbound() -> (Self, FeedHandle) {
        Self::with_binding(None)
    }

    fn with_binding(bound: Option<String>) -> (Self, FeedHandle) {
        let (tx, rx) = mpsc::unbounded();
        let database = Self {
            bound,
            update_seq: Seq::from(42),
            fail_info: false,
            info_gate: None,
            body: Mutex::new(Some(rx)),
            info_calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        };
        (database, FeedHandle { tx })
    }

    pub fn with_update_seq(mut self, seq: impl Into<Seq>) -> Self {
        self.update_seq = seq.into();
        self
    }

    pub fn failing_info(mut self) -> Self {
        self.fail_info = true;
        self
    }

    /// `info` waits for a notification on `gate` before answering.
    pub fn gated_info(mut self, gate: Arc<Notify>) -> Self {
        self.info_gate = Some(gate);
        self
    }

    pub fn info_calls(&self) -> Vec<Option<String>> {
        self.info_calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    fn bound_name(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    async fn info(&self, name: Option<&str>) -> Result<DatabaseInfo, BindingError> {
        self.info_calls
            .lock()
            .unwrap()
            .push(name.map(ToString::to_string));
        if let Some(gate) = &self.info_gate {
            gate.notified().await;
        }
        if self.fail_info {
            return Err(BindingError::Other("database unavailable".to_string()));
        }
        Ok(DatabaseInfo {
            db_name: name.or(self.bound.as_deref()).map(ToString::to_string),
            update_seq: self.update_seq.clone(),
            extra: Default::default(),
        })
    }

    fn changes_url(&self, name: Option<&str>, query: &ChangesQuery) -> Result<Url, BindingError> {
        let name = name
            .or(self.bound.as_deref())
            .ok_or(BindingError::NoDatabase)?;
        let mut url = Url::parse("http://couch.test/")?;
        url.path_segments_mut()
            .map_err(|_| BindingError::Other("test url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(name)
            .push("_changes");
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<BodyStream, BindingError> {
        assert_eq!(method, Method::GET);
        self.requests.lock().unwrap().push(url);
        let rx = self
            .body
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BindingError::Other("body already taken".to_string()))?;
        Ok(rx.boxed())
    }
}

impl FeedHandle {
    /// Sends `line` followed by the delimiter.
    pub fn send_line(&self, line: &str) {
        self.send_bytes(format!("{line}\n").into_bytes());
    }

    pub fn send_bytes(&self, bytes: impl Into<Bytes>) {
        let _ = self.tx.unbounded_send(Ok(bytes.into()));
    }

    pub fn fail(&self, err: TransportError) {
        let _ = self.tx.unbounded_send(Err(err));
    }

    /// Ends the body cleanly.
    pub fn close(self) {
        drop(self);
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Logs `<label>:change:<id>` and `<label>:closed:<reason>`.
pub struct RecordingListener {
    label: &'static str,
    log: EventLog,
    changes: Mutex<Vec<Change>>,
}

impl RecordingListener {
    pub fn new(label: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
            changes: Mutex::new(Vec::new()),
        })
    }

    pub fn changes(&self) -> Vec<Change> {
        self.changes.lock().unwrap().clone()
    }
}

impl ChangeListener for RecordingListener {
    fn on_change(&self, change: &Change) {
        self.changes.lock().unwrap().push(change.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:change:{}", self.label, change.id));
    }

    fn on_closed(&self, reason: &CloseReason) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:closed:{reason}", self.label));
    }
}

/// Logs `<label>:invalidate:<id>`.
pub struct RecordingCache {
    label: &'static str,
    log: EventLog,
}

impl RecordingCache {
    pub fn new(label: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
        })
    }
}

impl ChangeCache for RecordingCache {
    fn invalidate(&self, document_id: &str) -> Result<(), CacheError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:invalidate:{document_id}", self.label));
        Ok(())
    }
}

pub struct FailingCache;

impl ChangeCache for FailingCache {
    fn invalidate(&self, document_id: &str) -> Result<(), CacheError> {
        Err(CacheError::new(format!("cannot evict {document_id}")))
    }
}

/// Polls `condition` until it holds; panics after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `future`, failing the test if it takes longer than two seconds.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}
