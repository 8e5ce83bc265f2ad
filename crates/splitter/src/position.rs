use serde::{Deserialize, Serialize};

/// A location in the script, as the editor sees it.
///
/// `offset` counts characters (not bytes) from the start of the input.
/// `line` and `column` are zero-based; `column` resets after every `\n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "position")]
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }
}

/// Cursor that advances in lock-step with the scanner.
///
/// Besides the editor-facing [`Position`] it keeps the byte index used for
/// slicing, and whether the current line has held only whitespace so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTracker {
    byte: usize,
    position: Position,
    line_blank: bool,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self {
            byte: 0,
            position: Position::default(),
            line_blank: true,
        }
    }
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte index into the text being scanned.
    pub fn byte(&self) -> usize {
        self.byte
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// True while nothing but whitespace has been consumed on the current line.
    pub fn line_blank(&self) -> bool {
        self.line_blank
    }

    /// Account for one consumed character.
    pub fn advance(&mut self, ch: char) {
        self.byte += ch.len_utf8();
        self.position.offset += 1;
        if ch == '\n' {
            self.position.line += 1;
            self.position.column = 0;
            self.line_blank = true;
        } else {
            self.position.column += 1;
            if !ch.is_whitespace() {
                self.line_blank = false;
            }
        }
    }

    /// Same tracker, re-based so that byte indices are relative to `byte`.
    ///
    /// Used when the text before `byte` has been dropped from a buffer.
    pub(crate) fn rebased(mut self, byte: usize) -> Self {
        self.byte -= byte;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(text: &str) -> PositionTracker {
        let mut tracker = PositionTracker::new();
        for ch in text.chars() {
            tracker.advance(ch);
        }
        tracker
    }

    #[test]
    fn test_single_line() {
        let tracker = track("SELECT 1");
        assert_eq!(tracker.position(), Position::new(8, 0, 8));
        assert_eq!(tracker.byte(), 8);
        assert!(!tracker.line_blank());
    }

    #[test]
    fn test_newline_resets_column() {
        let tracker = track("ab\ncd");
        assert_eq!(tracker.position(), Position::new(5, 1, 2));
    }

    #[test]
    fn test_line_blank_after_newline_and_whitespace() {
        let tracker = track("SELECT 1\n   \t");
        assert!(tracker.line_blank());
        assert_eq!(tracker.position().line, 1);
        assert_eq!(tracker.position().column, 4);
    }

    #[test]
    fn test_multibyte_counts_characters() {
        let tracker = track("é€x");
        assert_eq!(tracker.position().offset, 3);
        assert_eq!(tracker.position().column, 3);
        assert_eq!(tracker.byte(), "é€x".len());
    }

    #[test]
    fn test_crlf() {
        let tracker = track("a\r\nb");
        assert_eq!(tracker.position(), Position::new(4, 1, 1));
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&Position::new(24, 1, 0)).unwrap();
        assert_eq!(json, r#"{"position":24,"line":1,"column":0}"#);
    }
}
