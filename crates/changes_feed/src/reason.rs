use std::fmt;

use changes_framing::FramingError;
use thiserror::Error;

/// Stable classification of why a response body stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// The connection was closed cleanly.
    ConnectionDone,
    /// The connection dropped or could not be established.
    ConnectionLost,
    /// The body ended before the response was complete.
    DataLoss,
    Timeout,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::ConnectionDone => "connection done",
            TransportErrorKind::ConnectionLost => "connection lost",
            TransportErrorKind::DataLoss => "data loss",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Other => "transport error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection_done() -> Self {
        Self::new(
            TransportErrorKind::ConnectionDone,
            "connection was closed cleanly",
        )
    }

    pub fn data_loss() -> Self {
        Self::new(
            TransportErrorKind::DataLoss,
            "response body ended before completion",
        )
    }
}

/// Why a changes feed connection ended, as reported to listeners.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CloseReason {
    #[error("connection was closed cleanly")]
    ConnectionDone,
    /// The response failed; the first entry is the primary cause.
    #[error("response failed: {}", describe_reasons(.0))]
    ResponseFailed(Vec<TransportError>),
    #[error("feed protocol error: {0}")]
    Protocol(FramingError),
}

impl CloseReason {
    pub fn is_clean(&self) -> bool {
        matches!(self, CloseReason::ConnectionDone)
    }

    pub fn primary_kind(&self) -> Option<TransportErrorKind> {
        match self {
            CloseReason::ConnectionDone => Some(TransportErrorKind::ConnectionDone),
            CloseReason::ResponseFailed(reasons) => reasons.first().map(|reason| reason.kind),
            CloseReason::Protocol(_) => None,
        }
    }
}

fn describe_reasons(reasons: &[TransportError]) -> String {
    if reasons.is_empty() {
        return "no cause reported".to_string();
    }
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalizes a raw close reason.
///
/// Abandoning a response body mid-stream is reported by the transport as a
/// failed response whose primary cause is a clean close. When the session had
/// already stopped running that close was requested, so it is reported as
/// [`CloseReason::ConnectionDone`]. Every other reason passes through unchanged.
pub fn classify_close(was_running: bool, raw: CloseReason) -> CloseReason {
    match raw {
        CloseReason::ResponseFailed(reasons)
            if !was_running
                && reasons
                    .first()
                    .is_some_and(|reason| reason.kind == TransportErrorKind::ConnectionDone) =>
        {
            CloseReason::ConnectionDone
        }
        raw => raw,
    }
}
