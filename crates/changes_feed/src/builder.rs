use std::sync::Arc;

use changes_framing::FramingLimits;

use crate::{
    binding::Database,
    change::Seq,
    error::FeedError,
    listener::{ChangeCache, ChangeListener},
    session::{ChangeNotifier, Registry},
};

pub struct ChangeNotifierBuilder {
    database: Arc<dyn Database>,
    db_name: Option<String>,
    since: Option<Seq>,
    limits: FramingLimits,
    registry: Registry,
}

impl ChangeNotifierBuilder {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self {
            database,
            db_name: None,
            since: None,
            limits: FramingLimits::default(),
            registry: Registry::default(),
        }
    }

    /// Required for unbound handles; must match the bound name otherwise.
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    /// Resume from `since` instead of the database's current update sequence.
    pub fn since(mut self, since: impl Into<Seq>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.limits.max_line_bytes = max_line_bytes;
        self
    }

    pub fn limits(mut self, limits: FramingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ChangeCache>) -> Self {
        self.registry.caches.push(cache);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.registry.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<ChangeNotifier, FeedError> {
        ChangeNotifier::from_parts(
            self.database,
            self.db_name,
            self.since,
            self.limits,
            self.registry,
        )
    }
}
