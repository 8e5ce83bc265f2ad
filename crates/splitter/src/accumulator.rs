use serde::{Deserialize, Serialize};

use crate::position::{Position, PositionTracker};

/// One statement cut out of a script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Statement text without surrounding whitespace or trailing separator.
    pub text: String,
    /// Position of the first non-whitespace character.
    pub trim_start: Position,
    /// Position just past the last non-whitespace character.
    pub end: Position,
}

/// Collects statement spans between boundaries.
///
/// The scanner feeds every character that belongs to a statement together
/// with the tracker state before and after it. Separators and consumed
/// keyword lines are never fed, so a span is always contiguous in the input.
pub struct StatementAccumulator<'a> {
    input: &'a str,
    first: Option<PositionTracker>,
    last: Option<PositionTracker>,
    statements: Vec<Statement>,
}

impl<'a> StatementAccumulator<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::resume(input, None)
    }

    /// Continue a span opened in an earlier pass over the same buffer.
    pub(crate) fn resume(input: &'a str, open: Option<(PositionTracker, PositionTracker)>) -> Self {
        Self {
            input,
            first: open.map(|(first, _)| first),
            last: open.map(|(_, last)| last),
            statements: Vec::new(),
        }
    }

    pub fn feed(&mut self, ch: char, before: PositionTracker, after: PositionTracker) {
        if ch.is_whitespace() {
            return;
        }
        if self.first.is_none() {
            self.first = Some(before);
        }
        self.last = Some(after);
    }

    /// First and last trackers of the open span, if any text is pending.
    pub(crate) fn open_span(&self) -> Option<(PositionTracker, PositionTracker)> {
        self.first.zip(self.last)
    }

    /// Close the current span. Whitespace-only spans produce nothing.
    pub fn flush(&mut self) {
        let (Some(first), Some(last)) = (self.first.take(), self.last.take()) else {
            return;
        };
        self.statements.push(Statement {
            text: self.input[first.byte()..last.byte()].to_string(),
            trim_start: first.position(),
            end: last.position(),
        });
    }

    /// Statements closed so far; the open span is left untouched.
    pub(crate) fn take_closed(&mut self) -> Vec<Statement> {
        std::mem::take(&mut self.statements)
    }

    pub fn finish(mut self) -> Vec<Statement> {
        self.flush();
        self.statements
    }
}
