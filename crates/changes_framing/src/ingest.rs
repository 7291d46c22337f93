use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::trace;

use crate::config::FramingLimits;
use crate::error::{FramingError, IngestError, LineRecord, LineRecordError};
use crate::line_parser::{ClassifiedParserError, LineInput, LineParser};
use crate::reader::{FramedLine, FramedLines};

/// Couples a [`FramedLines`] stream with a [`LineParser`].
///
/// Blank lines are treated as keep-alives and never reach the parser. Lines
/// the parser rejects come back as records with an error outcome; only
/// framing overflow and transport errors end ingestion.
pub struct LineIngestor<S, P> {
    lines: FramedLines<S>,
    parser: P,
    finished: bool,
}

impl<S, E, P> LineIngestor<S, P>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    P: LineParser,
{
    pub fn new(stream: S, parser: P, limits: FramingLimits) -> Self {
        Self {
            lines: FramedLines::new(stream, limits),
            parser,
            finished: false,
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn into_parser(self) -> P {
        self.parser
    }

    fn normalize_line(line: &str) -> &str {
        line.strip_suffix('\r').unwrap_or(line)
    }

    fn line_is_blank(line: &str) -> bool {
        line.chars().all(|ch| ch.is_whitespace())
    }

    /// Returns the next parsed or rejected line, a fatal error, or `None` once
    /// the body has ended. After an error or `None` the ingestor stays exhausted.
    pub async fn next_record(&mut self) -> Option<Result<LineRecord<P::Event>, IngestError<E>>> {
        if self.finished {
            return None;
        }

        loop {
            let next = match self.lines.next().await {
                Some(next) => next,
                None => {
                    self.finished = true;
                    return None;
                }
            };

            match next {
                Err(err) => {
                    self.finished = true;
                    return Some(Err(IngestError::Transport(err)));
                }
                Ok(FramedLine::LineTooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                }) => {
                    self.finished = true;
                    return Some(Err(IngestError::Framing(FramingError::LineTooLong {
                        line_number,
                        observed_bytes,
                        max_line_bytes,
                    })));
                }
                Ok(FramedLine::Line { line_number, bytes }) => {
                    let Ok(raw_line) = String::from_utf8(bytes) else {
                        return Some(Ok(LineRecord {
                            line_number,
                            outcome: Err(LineRecordError::InvalidUtf8),
                        }));
                    };
                    let line = Self::normalize_line(&raw_line);
                    if Self::line_is_blank(line) {
                        trace!(line_number, "keep-alive line");
                        continue;
                    }

                    let input = LineInput { line_number, line };
                    match self.parser.parse_line(input) {
                        Ok(None) => continue,
                        Ok(Some(event)) => {
                            return Some(Ok(LineRecord {
                                line_number,
                                outcome: Ok(event),
                            }));
                        }
                        Err(err) => {
                            return Some(Ok(LineRecord {
                                line_number,
                                outcome: Err(LineRecordError::Parse {
                                    code: err.code(),
                                    summary: err.redacted_summary(),
                                }),
                            }));
                        }
                    }
                }
            }
        }
    }
}
