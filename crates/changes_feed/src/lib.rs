#![forbid(unsafe_code)]
//! Follows a CouchDB-style continuous `_changes` feed.
//!
//! A [`ChangeNotifier`] opens one long-lived request against a [`Database`],
//! frames the body into lines, decodes each line into a [`Change`] and, for
//! every change, invalidates the registered [`ChangeCache`]s and notifies the
//! registered [`ChangeListener`]s. When the connection ends the listeners learn
//! why through a [`CloseReason`]; a requested stop is reported as a clean close.
//!
//! [`CouchDatabase`] is the HTTP binding. Anything else implementing
//! [`Database`] can stand in for it.

mod binding;
mod builder;
mod change;
mod decoder;
mod error;
mod http;
mod listener;
mod options;
mod reason;
mod session;

pub use binding::{BodyStream, ChangesQuery, Database, FeedMode};
pub use builder::ChangeNotifierBuilder;
pub use change::{Change, DatabaseInfo, Revision, Seq};
pub use decoder::{ChangeDecoder, DecodeError};
pub use error::{BindingError, CacheError, FeedError};
pub use http::CouchDatabase;
pub use listener::{ChangeCache, ChangeListener};
pub use options::StartOptions;
pub use reason::{classify_close, CloseReason, TransportError, TransportErrorKind};
pub use session::{ChangeNotifier, FeedStats, Phase};

pub use changes_framing::FramingLimits;
