use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accumulator::{Statement, StatementAccumulator};
use crate::dialect::Dialect;
use crate::options::DialectConfiguration;
use crate::position::PositionTracker;
use crate::scanner::Scanner;

/// Result of [`split`], shaped by `return_rich_info`.
///
/// Serializes untagged: a JSON array of strings, or of statement records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplitOutput {
    Texts(Vec<String>),
    Rich(Vec<Statement>),
}

impl SplitOutput {
    pub fn len(&self) -> usize {
        match self {
            SplitOutput::Texts(texts) => texts.len(),
            SplitOutput::Rich(statements) => statements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_rich(&self) -> bool {
        matches!(self, SplitOutput::Rich(_))
    }

    /// Statement texts, whatever the shape.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            SplitOutput::Texts(texts) => texts.iter().map(String::as_str).collect(),
            SplitOutput::Rich(statements) => statements.iter().map(|s| s.text.as_str()).collect(),
        }
    }

    pub fn into_texts(self) -> Vec<String> {
        match self {
            SplitOutput::Texts(texts) => texts,
            SplitOutput::Rich(statements) => statements.into_iter().map(|s| s.text).collect(),
        }
    }
}

/// Split a script into statements.
///
/// `None` uses the generic SQL preset. The output shape follows the
/// configuration's `return_rich_info` flag. Never fails: unterminated
/// quotes and comments simply run to the end of the input.
pub fn split(text: &str, config: Option<&DialectConfiguration>) -> SplitOutput {
    let config = config.unwrap_or_else(|| Dialect::Generic.config());
    let statements = split_statements(text, config);
    if config.return_rich_info() {
        SplitOutput::Rich(statements)
    } else {
        SplitOutput::Texts(statements.into_iter().map(|s| s.text).collect())
    }
}

/// Split a script and always return positioned statements.
pub fn split_statements(text: &str, config: &DialectConfiguration) -> Vec<Statement> {
    let statements = if keep_whole(text, config) {
        whole_input(text, PositionTracker::new())
    } else if config.split_by_lines() {
        split_lines(text, PositionTracker::new()).0
    } else {
        Scanner::new(text, config).scan()
    };
    debug!(
        "Split {} bytes into {} statements",
        text.len(),
        statements.len()
    );
    statements
}

/// Split a script and return only the statement texts.
pub fn split_texts(text: &str, config: &DialectConfiguration) -> Vec<String> {
    split_statements(text, config)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

pub(crate) fn keep_whole(text: &str, config: &DialectConfiguration) -> bool {
    config.no_split() || (config.prevent_single_line_split() && !text.contains('\n'))
}

/// The whole trimmed text as one statement (none if it is blank).
pub(crate) fn whole_input(text: &str, start: PositionTracker) -> Vec<Statement> {
    let mut acc = StatementAccumulator::new(text);
    let mut tracker = start;
    for ch in text.chars() {
        let before = tracker;
        tracker.advance(ch);
        acc.feed(ch, before, tracker);
    }
    acc.finish()
}

/// One statement per non-blank line. Also returns the tracker at the end of `text`.
pub(crate) fn split_lines(text: &str, start: PositionTracker) -> (Vec<Statement>, PositionTracker) {
    let mut acc = StatementAccumulator::new(text);
    let mut tracker = start;
    for ch in text.chars() {
        let before = tracker;
        tracker.advance(ch);
        if ch == '\n' {
            acc.flush();
        } else {
            acc.feed(ch, before, tracker);
        }
    }
    (acc.finish(), tracker)
}
