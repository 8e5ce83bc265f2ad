use tracing::trace;

use crate::accumulator::Statement;
use crate::options::DialectConfiguration;
use crate::scanner::{Checkpoint, Scanner};
use crate::splitter::{split_lines, whole_input};

/// Chunk-fed splitter for scripts that arrive in pieces (file reads, pipes).
///
/// Only complete lines are scanned, and each byte is scanned once: the
/// scanner's mode, separator, bracket depth and open statement span are
/// carried from one push to the next. The buffer keeps the open statement's
/// text plus the incomplete last line. Every boundary rule looks ahead at
/// most to the end of the current line, so the statements produced are the
/// same as splitting the concatenated input in one go.
pub struct StreamSplitter {
    config: DialectConfiguration,
    buffer: String,
    /// Scanner state at the end of the scanned part of `buffer`.
    checkpoint: Checkpoint,
    seen_newline: bool,
    #[cfg(test)]
    scanned_bytes: usize,
}

impl StreamSplitter {
    pub fn new(config: DialectConfiguration) -> Self {
        let checkpoint = Checkpoint::start(&config);
        Self {
            config,
            buffer: String::new(),
            checkpoint,
            seen_newline: false,
            #[cfg(test)]
            scanned_bytes: 0,
        }
    }

    /// Separator in force at the current scan position.
    ///
    /// Differs from the configured one after a custom delimiter command.
    pub fn active_separator(&self) -> &str {
        &self.checkpoint.state.active_separator
    }

    /// Append a chunk and return the statements it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<Statement> {
        let appended_at = self.buffer.len();
        self.buffer.push_str(chunk);
        if self.config.no_split() {
            return Vec::new();
        }
        let Some(newline) = chunk.rfind('\n') else {
            return Vec::new();
        };
        self.seen_newline = true;
        let complete = &self.buffer[..=appended_at + newline];
        #[cfg(test)]
        {
            self.scanned_bytes += complete.len() - self.checkpoint.tracker.byte();
        }

        let (statements, checkpoint) = if self.config.split_by_lines() {
            let (statements, tracker) = split_lines(complete, self.checkpoint.tracker);
            (statements, Checkpoint { tracker, ..self.checkpoint.clone() })
        } else {
            Scanner::resume(complete, &self.config, self.checkpoint.clone()).scan_closed()
        };

        let consumed = checkpoint.retained_from();
        self.buffer.drain(..consumed);
        self.checkpoint = checkpoint.rebased(consumed);
        trace!(
            "Stream splitter emitted {} statements, {} bytes pending",
            statements.len(),
            self.buffer.len()
        );
        statements
    }

    /// Flush whatever is left as the final statements.
    pub fn finish(self) -> Vec<Statement> {
        // Nothing was scanned in either case, so the buffer is the whole script.
        if self.config.no_split() || (self.config.prevent_single_line_split() && !self.seen_newline) {
            return whole_input(&self.buffer, self.checkpoint.tracker);
        }
        if self.config.split_by_lines() {
            return split_lines(&self.buffer, self.checkpoint.tracker).0;
        }
        Scanner::resume(&self.buffer, &self.config, self.checkpoint).scan()
    }
}
