#![forbid(unsafe_code)]
//! Framing primitives for newline-delimited JSON feeds delivered over an
//! indefinite-length body.
//!
//! This crate knows nothing about HTTP or about the records themselves. It provides:
//! - A bounded-memory, push-based newline framer and a `Stream` adapter over body chunks.
//! - The [`LineParser`] seam that record decoders implement.
//! - An async ingestion loop that skips keep-alive lines and separates per-line
//!   rejections from fatal stream errors.

mod config;
mod error;
mod ingest;
mod line_parser;
mod reader;

pub use config::FramingLimits;
pub use error::{FramingError, IngestError, LineRecord, LineRecordError, ParseErrorCode};
pub use ingest::LineIngestor;
pub use line_parser::{ClassifiedParserError, LineInput, LineParser};
pub use reader::{FramedLine, FramedLines, LineFramer};
