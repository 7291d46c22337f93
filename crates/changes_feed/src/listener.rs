use crate::change::Change;
use crate::error::CacheError;
use crate::reason::CloseReason;

/// Receives changes from a [`ChangeNotifier`](crate::ChangeNotifier).
///
/// Callbacks run on the feed's delivery task, one at a time and in feed order.
/// A slow callback delays every later change, so hand heavy work off elsewhere.
pub trait ChangeListener: Send + Sync {
    /// Called for every change that carries an `id`.
    fn on_change(&self, change: &Change);

    /// Called once when the connection ends, after the last `on_change`.
    fn on_closed(&self, reason: &CloseReason) {
        let _ = reason;
    }
}

/// A cache keyed by document id that must forget stale entries.
///
/// Invalidation happens before listeners see the change. Failures are logged
/// and do not stop delivery.
pub trait ChangeCache: Send + Sync {
    fn invalidate(&self, document_id: &str) -> Result<(), CacheError>;
}
