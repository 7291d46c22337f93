use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use changes_framing::{FramingLimits, IngestError, LineIngestor, LineRecord, LineRecordError};
use reqwest::Method;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    binding::{BodyStream, ChangesQuery, Database},
    builder::ChangeNotifierBuilder,
    change::{Change, Seq},
    decoder::ChangeDecoder,
    error::FeedError,
    listener::{ChangeCache, ChangeListener},
    options::StartOptions,
    reason::{classify_close, CloseReason, TransportError},
};

/// Lifecycle of a [`ChangeNotifier`]. Sessions only move forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    /// Bootstrapping the cursor or waiting for the response.
    Starting,
    Running,
    /// `stop()` was called; the connection has not reported its end yet.
    Stopping,
    Stopped,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeedStats {
    pub changes_delivered: u64,
    /// Lines that were not changes: malformed JSON, no `id`, invalid UTF-8.
    pub records_dropped: u64,
    pub cache_failures: u64,
}

#[derive(Clone, Debug)]
enum Outcome {
    Pending,
    NeverConnected,
    Closed(CloseReason),
}

struct SessionState {
    phase: Phase,
    since: Option<Seq>,
    connection: Option<CancellationToken>,
    stats: FeedStats,
}

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) caches: Vec<Arc<dyn ChangeCache>>,
    pub(crate) listeners: Vec<Arc<dyn ChangeListener>>,
}

struct Shared {
    database: Arc<dyn Database>,
    db_name: Option<String>,
    limits: FramingLimits,
    state: Mutex<SessionState>,
    registry: Mutex<Registry>,
    outcome: watch::Sender<Outcome>,
}

/// Follows a database's continuous changes feed.
///
/// Register caches and listeners, then [`start`](Self::start). Every change
/// with an `id` advances the cursor, invalidates each cache and is handed to
/// each listener, all in registration order. When the connection ends for any
/// reason listeners get exactly one `on_closed`. The session does not
/// reconnect; build a new one from [`since`](Self::since) to resume.
///
/// Dropping the notifier stops the feed.
pub struct ChangeNotifier {
    shared: Arc<Shared>,
}

impl ChangeNotifier {
    pub fn builder(database: Arc<dyn Database>) -> ChangeNotifierBuilder {
        ChangeNotifierBuilder::new(database)
    }

    /// Shorthand for a builder with only a database name and a cursor.
    pub fn new(
        database: Arc<dyn Database>,
        db_name: Option<&str>,
        since: Option<Seq>,
    ) -> Result<Self, FeedError> {
        let mut builder = ChangeNotifierBuilder::new(database);
        if let Some(name) = db_name {
            builder = builder.database_name(name);
        }
        if let Some(since) = since {
            builder = builder.since(since);
        }
        builder.build()
    }

    pub(crate) fn from_parts(
        database: Arc<dyn Database>,
        db_name: Option<String>,
        since: Option<Seq>,
        limits: FramingLimits,
        registry: Registry,
    ) -> Result<Self, FeedError> {
        if database.is_bound() {
            if let (Some(bound), Some(requested)) = (database.bound_name(), db_name.as_deref()) {
                if bound != requested {
                    return Err(FeedError::DatabaseMismatch {
                        bound: bound.to_string(),
                        requested: requested.to_string(),
                    });
                }
            }
        } else if db_name.is_none() {
            return Err(FeedError::MissingDatabaseName);
        }

        let (outcome, _) = watch::channel(Outcome::Pending);
        Ok(Self {
            shared: Arc::new(Shared {
                database,
                db_name,
                limits,
                state: Mutex::new(SessionState {
                    phase: Phase::Idle,
                    since,
                    connection: None,
                    stats: FeedStats::default(),
                }),
                registry: Mutex::new(registry),
                outcome,
            }),
        })
    }

    pub fn add_cache(&self, cache: Arc<dyn ChangeCache>) {
        self.shared.lock_registry().caches.push(cache);
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.shared.lock_registry().listeners.push(listener);
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock_state().phase
    }

    /// Last cursor seen, or the one the session was built with.
    pub fn since(&self) -> Option<Seq> {
        self.shared.lock_state().since.clone()
    }

    pub fn stats(&self) -> FeedStats {
        self.shared.lock_state().stats
    }

    /// Database the feed reads from.
    pub fn database_name(&self) -> Option<&str> {
        self.shared
            .db_name
            .as_deref()
            .or_else(|| self.shared.database.bound_name())
    }

    /// Opens the continuous feed and resolves with the cursor it starts from.
    ///
    /// Without a cursor from the builder, the database's current `update_seq`
    /// is fetched first so only changes made from now on are delivered.
    pub async fn start(&self, options: StartOptions) -> Result<Seq, FeedError> {
        options.validate()?;

        let token = {
            let mut state = self.shared.lock_state();
            if state.phase != Phase::Idle {
                return Err(FeedError::InvalidState {
                    operation: "start",
                    phase: state.phase,
                });
            }
            state.phase = Phase::Starting;
            let token = CancellationToken::new();
            state.connection = Some(token.clone());
            token
        };

        let (since, body) = match self.open(options).await {
            Ok(opened) => opened,
            Err(err) => {
                {
                    let mut state = self.shared.lock_state();
                    state.phase = Phase::Stopped;
                    state.connection = None;
                }
                self.shared.outcome.send_replace(Outcome::NeverConnected);
                warn!(database = ?self.database_name(), error = %err, "changes feed failed to start");
                return Err(err);
            }
        };

        let running = {
            let mut state = self.shared.lock_state();
            if state.phase == Phase::Starting {
                state.phase = Phase::Running;
            }
            state.phase == Phase::Running
        };
        if running {
            info!(database = ?self.database_name(), since = %since, "changes feed running");
        } else {
            debug!(since = %since, "stop requested while starting; closing new connection");
        }
        tokio::spawn(pump(Arc::clone(&self.shared), body, token));

        Ok(since)
    }

    async fn open(&self, options: StartOptions) -> Result<(Seq, BodyStream), FeedError> {
        let database = &self.shared.database;
        let target = self.shared.target_name();

        let since = match self.since() {
            Some(since) => since,
            None => {
                let info = database
                    .info(target)
                    .await
                    .map_err(FeedError::Bootstrap)?;
                debug!(update_seq = %info.update_seq, "bootstrapped cursor from database info");
                self.shared.lock_state().since = Some(info.update_seq.clone());
                info.update_seq
            }
        };

        let query = ChangesQuery::continuous(Some(since.clone())).with_params(options.into_params());
        let url = database
            .changes_url(target, &query)
            .map_err(FeedError::Request)?;
        debug!(path = url.path(), since = %since, "requesting continuous changes");
        let body = database
            .request(Method::GET, url)
            .await
            .map_err(FeedError::Request)?;

        Ok((since, body))
    }

    /// Stops delivery. Listeners still receive `on_closed`, asynchronously;
    /// await [`closed`](Self::closed) to wait for it.
    ///
    /// Calling this while `start` is pending closes the connection as soon as
    /// it opens.
    pub fn stop(&self) -> Result<(), FeedError> {
        let mut state = self.shared.lock_state();
        match state.phase {
            Phase::Running | Phase::Starting => {
                state.phase = Phase::Stopping;
                if let Some(token) = &state.connection {
                    token.cancel();
                }
                info!(database = ?self.database_name(), "stopping changes feed");
                Ok(())
            }
            phase => Err(FeedError::InvalidState {
                operation: "stop",
                phase,
            }),
        }
    }

    /// Waits until the session has stopped.
    ///
    /// Resolves with the reason delivered to listeners, or `None` when `start`
    /// failed before a connection existed. Pending forever on a session that
    /// is never started.
    pub async fn closed(&self) -> Option<CloseReason> {
        let mut rx = self.shared.outcome.subscribe();
        let outcome = match rx
            .wait_for(|outcome| !matches!(outcome, Outcome::Pending))
            .await
        {
            Ok(outcome) => outcome.clone(),
            Err(_) => return None,
        };
        match outcome {
            Outcome::Closed(reason) => Some(reason),
            Outcome::Pending | Outcome::NeverConnected => None,
        }
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state();
        if matches!(state.phase, Phase::Running | Phase::Starting) {
            state.phase = Phase::Stopping;
        }
        if let Some(token) = &state.connection {
            token.cancel();
        }
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bound handles address their own database.
    fn target_name(&self) -> Option<&str> {
        if self.database.is_bound() {
            None
        } else {
            self.db_name.as_deref()
        }
    }

    fn snapshot(&self) -> (Vec<Arc<dyn ChangeCache>>, Vec<Arc<dyn ChangeListener>>) {
        let registry = self.lock_registry();
        (registry.caches.clone(), registry.listeners.clone())
    }

    fn changed(&self, change: Change) {
        if let Some(seq) = &change.seq {
            self.lock_state().since = Some(seq.clone());
        }
        debug!(id = %change.id, seq = ?change.seq, deleted = change.deleted, "change received");

        let (caches, listeners) = self.snapshot();
        let mut cache_failures = 0;
        for cache in &caches {
            if let Err(err) = cache.invalidate(&change.id) {
                cache_failures += 1;
                warn!(id = %change.id, error = %err, "cache invalidation failed");
            }
        }
        for listener in &listeners {
            listener.on_change(&change);
        }

        let mut state = self.lock_state();
        state.stats.changes_delivered += 1;
        state.stats.cache_failures += cache_failures;
    }

    fn dropped(&self, line_number: usize, err: &LineRecordError) {
        debug!(line_number, error = %err, "skipping feed line");
        self.lock_state().stats.records_dropped += 1;
    }

    fn connection_lost(&self, raw: CloseReason) {
        let reason = {
            let mut state = self.lock_state();
            if state.phase == Phase::Stopped {
                debug!(reason = %raw, "ignoring connection loss on a stopped feed");
                return;
            }
            let was_running = state.phase == Phase::Running;
            state.connection = None;
            state.phase = Phase::Stopped;
            classify_close(was_running, raw)
        };

        if reason.is_clean() {
            info!(reason = %reason, "changes feed closed");
        } else {
            warn!(reason = %reason, "changes feed connection lost");
        }

        let (_, listeners) = self.snapshot();
        for listener in &listeners {
            listener.on_closed(&reason);
        }
        self.outcome.send_replace(Outcome::Closed(reason));
    }
}

/// Frames, decodes and delivers the body until it ends or the session cancels it.
async fn pump(shared: Arc<Shared>, body: BodyStream, token: CancellationToken) {
    let mut ingestor = LineIngestor::new(body, ChangeDecoder::new(), shared.limits);

    let raw = loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                break CloseReason::ResponseFailed(vec![
                    TransportError::connection_done(),
                    TransportError::data_loss(),
                ]);
            }
            next = ingestor.next_record() => next,
        };

        match next {
            None => break CloseReason::ConnectionDone,
            Some(Err(IngestError::Transport(err))) => break CloseReason::ResponseFailed(vec![err]),
            Some(Err(IngestError::Framing(err))) => break CloseReason::Protocol(err),
            Some(Ok(LineRecord {
                outcome: Ok(change),
                ..
            })) => shared.changed(change),
            Some(Ok(LineRecord {
                line_number,
                outcome: Err(err),
            })) => shared.dropped(line_number, &err),
        }
    };

    drop(ingestor);
    shared.connection_lost(raw);
}
