use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParseErrorCode {
    JsonParse,
    WrongShape,
    MissingField,
    TypedParse,
}

/// Fatal framing failure; the stream cannot be trusted past this point.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FramingError {
    #[error(
        "line {line_number} too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})"
    )]
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
}

/// Per-line failure. The line is skipped and ingestion continues.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum LineRecordError {
    #[error("invalid UTF-8 in feed line")]
    InvalidUtf8,
    #[error("line parse failure ({code:?}): {summary}")]
    Parse {
        code: ParseErrorCode,
        summary: String,
    },
}

#[derive(Debug, Clone)]
pub struct LineRecord<T> {
    pub line_number: usize,
    pub outcome: Result<T, LineRecordError>,
}

/// Errors that end ingestion.
#[derive(Debug, Error)]
pub enum IngestError<E> {
    #[error(transparent)]
    Framing(FramingError),
    #[error("transport error while reading feed body: {0}")]
    Transport(#[source] E),
}
