use std::collections::VecDeque;

use crate::config::FramingLimits;

const DELIMITER: u8 = b'\n';

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FramedLine {
    /// A complete line without its delimiter. May be empty.
    Line { line_number: usize, bytes: Vec<u8> },
    /// Reported as soon as the line crosses the limit; the rest of it is discarded.
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
}

/// Push-based newline framer with a per-line memory cap.
///
/// Chunks are fed with [`push`](Self::push) in arrival order and complete lines
/// are drained with [`next_line`](Self::next_line). Chunk boundaries are
/// invisible in the output.
#[derive(Debug)]
pub struct LineFramer {
    max_line_bytes: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discard_mode: bool,
    line_number: usize,
    ready: VecDeque<FramedLine>,
    finished: bool,
}

impl LineFramer {
    pub fn new(limits: FramingLimits) -> Self {
        Self {
            max_line_bytes: limits.max_line_bytes,
            current_line: Vec::new(),
            observed_bytes: 0,
            discard_mode: false,
            line_number: 0,
            ready: VecDeque::new(),
            finished: false,
        }
    }

    pub fn push(&mut self, mut chunk: &[u8]) {
        if self.finished {
            return;
        }

        while !chunk.is_empty() {
            match chunk.iter().position(|b| *b == DELIMITER) {
                Some(idx) => {
                    self.append(&chunk[..idx]);
                    self.finish_line();
                    chunk = &chunk[idx + 1..];
                }
                None => {
                    self.append(chunk);
                    break;
                }
            }
        }
    }

    /// Flushes an unterminated trailing line. Further pushes are ignored.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.discard_mode {
            self.reset_line_state();
        } else if !self.current_line.is_empty() {
            self.finish_line();
        }
    }

    pub fn next_line(&mut self) -> Option<FramedLine> {
        self.ready.pop_front()
    }

    /// Bytes held for the line currently being assembled.
    pub fn buffered_bytes(&self) -> usize {
        self.current_line.len()
    }

    pub fn lines_framed(&self) -> usize {
        self.line_number
    }

    fn append(&mut self, segment: &[u8]) {
        self.observed_bytes = self.observed_bytes.saturating_add(segment.len());
        if self.discard_mode {
            return;
        }
        if self.observed_bytes > self.max_line_bytes {
            self.discard_mode = true;
            self.current_line = Vec::new();
            self.ready.push_back(FramedLine::LineTooLong {
                line_number: self.line_number + 1,
                observed_bytes: self.observed_bytes,
                max_line_bytes: self.max_line_bytes,
            });
            return;
        }
        self.current_line.extend_from_slice(segment);
    }

    fn finish_line(&mut self) {
        let line_number = self.line_number + 1;
        self.line_number = line_number;

        if self.discard_mode {
            self.reset_line_state();
            return;
        }

        let bytes = std::mem::take(&mut self.current_line);
        self.reset_line_state();
        self.ready.push_back(FramedLine::Line { line_number, bytes });
    }

    fn reset_line_state(&mut self) {
        self.current_line.clear();
        self.observed_bytes = 0;
        self.discard_mode = false;
    }
}
