//! Statement boundary scanner
//!
//! Single pass over the script, one character (or one marker) per step.
//! The lexical mode decides which rules apply; separators are only
//! recognized in `Normal` mode, so whatever context is innermost wins.

use tracing::{debug, trace};

use crate::accumulator::{Statement, StatementAccumulator};
use crate::options::{DialectConfiguration, SplittingStrategy};
use crate::position::PositionTracker;

/// Lexical context the scanner is currently in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    Normal,
    /// Inside a string literal opened by the given quote.
    InStringLiteral(char),
    /// Inside a quoted identifier opened by the given quote.
    InQuotedIdentifier(char),
    /// Inside `[...]`.
    InBracketIdentifier,
    InLineComment,
    /// Inside a block comment; `delimiter` indexes the dialect's delimiter list.
    InBlockComment { delimiter: usize, depth: usize },
    /// Inside `$tag$ ... $tag$`.
    InDollarQuote(String),
    /// Reading the new separator after the custom delimiter keyword.
    InCustomDelimiterDeclaration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerState {
    pub mode: ScanMode,
    pub active_separator: String,
    /// Bracket nesting depth, only tracked by the balance strategy.
    pub depth: usize,
}

impl ScannerState {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            mode: ScanMode::Normal,
            active_separator: separator.into(),
            depth: 0,
        }
    }
}

/// Everything needed to continue a scan over text appended later.
///
/// Tracker byte indexes are relative to the buffer being scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    pub state: ScannerState,
    /// Scan position.
    pub tracker: PositionTracker,
    /// First and last trackers of the statement still open.
    pub open: Option<(PositionTracker, PositionTracker)>,
}

impl Checkpoint {
    pub fn start(config: &DialectConfiguration) -> Self {
        Self {
            state: ScannerState::new(config.statement_separator()),
            tracker: PositionTracker::new(),
            open: None,
        }
    }

    /// Byte index of the first character still needed: the open statement's
    /// start, or the scan position when nothing is open.
    pub fn retained_from(&self) -> usize {
        self.open.map_or(self.tracker.byte(), |(first, _)| first.byte())
    }

    /// Same checkpoint after the first `byte` bytes were dropped from the buffer.
    pub fn rebased(self, byte: usize) -> Self {
        Self {
            state: self.state,
            tracker: self.tracker.rebased(byte),
            open: self
                .open
                .map(|(first, last)| (first.rebased(byte), last.rebased(byte))),
        }
    }
}

pub struct Scanner<'a> {
    input: &'a str,
    config: &'a DialectConfiguration,
    tracker: PositionTracker,
    state: ScannerState,
    acc: StatementAccumulator<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, config: &'a DialectConfiguration) -> Self {
        Self::resume(input, config, Checkpoint::start(config))
    }

    /// Continue a scan of `input` from a checkpoint taken over a prefix of it.
    pub(crate) fn resume(input: &'a str, config: &'a DialectConfiguration, checkpoint: Checkpoint) -> Self {
        Self {
            input,
            config,
            tracker: checkpoint.tracker,
            state: checkpoint.state,
            acc: StatementAccumulator::resume(input, checkpoint.open),
        }
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Scan the whole input and return every statement in order.
    pub fn scan(mut self) -> Vec<Statement> {
        while self.step() {}
        self.acc.finish()
    }

    /// Scan to the end of the input but keep the unfinished last statement open.
    pub(crate) fn scan_closed(mut self) -> (Vec<Statement>, Checkpoint) {
        while self.step() {}
        let checkpoint = Checkpoint {
            open: self.acc.open_span(),
            tracker: self.tracker,
            state: self.state,
        };
        (self.acc.take_closed(), checkpoint)
    }

    /// Advance by one rule application. Returns false at end of input.
    pub fn step(&mut self) -> bool {
        let Some(ch) = self.peek() else {
            return false;
        };
        let rest = self.rest();
        match &self.state.mode {
            ScanMode::Normal => self.step_normal(ch),
            ScanMode::InStringLiteral(quote) => {
                let quote = *quote;
                self.step_quoted(ch, quote, self.config.string_backslash_escapes());
            }
            ScanMode::InQuotedIdentifier(quote) => {
                let quote = *quote;
                self.step_quoted(ch, quote, false);
            }
            ScanMode::InBracketIdentifier => self.step_bracket(ch),
            ScanMode::InLineComment => {
                self.feed_char();
                if ch == '\n' {
                    self.state.mode = ScanMode::Normal;
                }
            }
            ScanMode::InBlockComment { delimiter, depth } => {
                let (delimiter, depth) = (*delimiter, *depth);
                self.step_block_comment(delimiter, depth);
            }
            ScanMode::InDollarQuote(tag) => match closing_dollar_len(rest, tag) {
                Some(len) => {
                    self.feed_bytes(len);
                    self.state.mode = ScanMode::Normal;
                }
                None => {
                    self.feed_char();
                }
            },
            ScanMode::InCustomDelimiterDeclaration => self.read_custom_delimiter(),
        }
        true
    }

    fn step_normal(&mut self, ch: char) {
        let config = self.config;
        let rest = self.rest();
        let lexical = config.splitting_strategy() == SplittingStrategy::Lexical;

        if self.tracker.line_blank() && !ch.is_whitespace() {
            if let Some(len) = self.match_delimiter_command(rest) {
                self.acc.flush();
                self.skip_bytes(len);
                self.state.mode = ScanMode::InCustomDelimiterDeclaration;
                return;
            }
            if let Some(len) = self.match_line_separator(rest) {
                trace!("Line separator keyword at line {}", self.tracker.position().line);
                self.acc.flush();
                self.skip_bytes(len);
                return;
            }
        }

        if let Some(marker) = config
            .line_comment_markers()
            .iter()
            .find(|m| rest.starts_with(m.as_str()))
        {
            self.feed_bytes(marker.len());
            self.state.mode = ScanMode::InLineComment;
            return;
        }

        if let Some((index, delimiter)) = config
            .block_comment_delimiters()
            .iter()
            .enumerate()
            .find(|(_, d)| rest.starts_with(d.start.as_str()))
        {
            self.feed_bytes(delimiter.start.len());
            self.state.mode = ScanMode::InBlockComment { delimiter: index, depth: 1 };
            return;
        }

        if config.string_quote_chars().contains(&ch) {
            self.feed_char();
            self.state.mode = ScanMode::InStringLiteral(ch);
            return;
        }

        if lexical && config.identifier_quote_chars().contains(&ch) {
            self.feed_char();
            self.state.mode = if ch == '[' {
                ScanMode::InBracketIdentifier
            } else {
                ScanMode::InQuotedIdentifier(ch)
            };
            return;
        }

        if config.dollar_quote_supported() {
            if let Some(tag) = match_dollar_tag(rest) {
                self.feed_bytes(tag.len() + 2);
                self.state.mode = ScanMode::InDollarQuote(tag.to_string());
                return;
            }
        }

        if !lexical {
            match ch {
                '(' | '[' | '{' => {
                    self.state.depth += 1;
                    self.feed_char();
                    return;
                }
                ')' | ']' | '}' => {
                    self.state.depth = self.state.depth.saturating_sub(1);
                    self.feed_char();
                    return;
                }
                _ => {}
            }
        }

        if (lexical || self.state.depth == 0) && rest.starts_with(self.state.active_separator.as_str()) {
            let len = self.state.active_separator.len();
            self.acc.flush();
            self.skip_bytes(len);
            return;
        }

        self.feed_char();
    }

    /// String literal or quoted identifier: a doubled quote is an escape.
    fn step_quoted(&mut self, ch: char, quote: char, backslash_escapes: bool) {
        if backslash_escapes && ch == '\\' {
            self.feed_char();
            self.feed_char();
            return;
        }
        self.feed_char();
        if ch == quote {
            if self.peek() == Some(quote) {
                self.feed_char();
            } else {
                self.state.mode = ScanMode::Normal;
            }
        }
    }

    fn step_bracket(&mut self, ch: char) {
        if ch == ']' {
            self.feed_char();
            if self.peek() == Some(']') {
                self.feed_char();
            } else {
                self.state.mode = ScanMode::Normal;
            }
            return;
        }
        if !self.config.allow_semicolon_inside_bracketed_identifier()
            && self.rest().starts_with(self.state.active_separator.as_str())
        {
            let len = self.state.active_separator.len();
            self.acc.flush();
            self.skip_bytes(len);
            self.state.mode = ScanMode::Normal;
            return;
        }
        self.feed_char();
    }

    fn step_block_comment(&mut self, index: usize, depth: usize) {
        let config = self.config;
        let rest = self.rest();
        let delimiter = &config.block_comment_delimiters()[index];
        if rest.starts_with(delimiter.end.as_str()) {
            self.feed_bytes(delimiter.end.len());
            self.state.mode = if depth > 1 {
                ScanMode::InBlockComment { delimiter: index, depth: depth - 1 }
            } else {
                ScanMode::Normal
            };
        } else if delimiter.nestable && rest.starts_with(delimiter.start.as_str()) {
            self.feed_bytes(delimiter.start.len());
            self.state.mode = ScanMode::InBlockComment { delimiter: index, depth: depth + 1 };
        } else {
            self.feed_char();
        }
    }

    /// Consume the rest of a `DELIMITER xx` line and make `xx` the separator.
    fn read_custom_delimiter(&mut self) {
        let line = line_of(self.rest());
        let separator = line.trim();
        if !separator.is_empty() {
            debug!(
                "Statement separator changed to {:?} at line {}",
                separator,
                self.tracker.position().line
            );
            self.state.active_separator = separator.to_string();
        }
        self.skip_bytes(line.len());
        if self.peek() == Some('\n') {
            self.skip_bytes(1);
        }
        self.state.mode = ScanMode::Normal;
    }

    /// Length of the keyword when `rest` starts a custom delimiter declaration.
    fn match_delimiter_command(&self, rest: &str) -> Option<usize> {
        let keyword = self.config.custom_delimiter_command()?;
        let head = rest.as_bytes().get(..keyword.len())?;
        if !head.eq_ignore_ascii_case(keyword.as_bytes()) {
            return None;
        }
        let line = line_of(&rest[keyword.len()..]);
        if line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            Some(keyword.len())
        } else {
            None
        }
    }

    /// Length of the whole line (with its newline) when it holds only the keyword.
    fn match_line_separator(&self, rest: &str) -> Option<usize> {
        let keyword = self.config.line_separator_keyword()?;
        let line = line_of(rest);
        if !line.trim().eq_ignore_ascii_case(keyword) {
            return None;
        }
        Some(if rest.len() > line.len() { line.len() + 1 } else { line.len() })
    }

    fn rest(&self) -> &'a str {
        &self.input[self.tracker.byte()..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn feed_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        let before = self.tracker;
        self.tracker.advance(ch);
        self.acc.feed(ch, before, self.tracker);
        Some(ch)
    }

    fn feed_bytes(&mut self, len: usize) {
        let target = self.tracker.byte() + len;
        while self.tracker.byte() < target && self.feed_char().is_some() {}
    }

    /// Consume text that belongs to no statement (separators, keyword lines).
    fn skip_bytes(&mut self, len: usize) {
        let target = self.tracker.byte() + len;
        while self.tracker.byte() < target {
            let Some(ch) = self.peek() else {
                break;
            };
            self.tracker.advance(ch);
        }
    }
}

/// Text up to (not including) the next newline.
fn line_of(text: &str) -> &str {
    text.find('\n').map_or(text, |i| &text[..i])
}

/// Tag of a `$tag$` opener at the start of `rest`. The tag may be empty.
fn match_dollar_tag(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix('$')?;
    let end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let tag = &body[..end];
    if tag.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    body[end..].starts_with('$').then_some(tag)
}

fn closing_dollar_len(rest: &str, tag: &str) -> Option<usize> {
    rest.strip_prefix('$')?
        .strip_prefix(tag)?
        .starts_with('$')
        .then_some(tag.len() + 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn texts(input: &str, config: &DialectConfiguration) -> Vec<String> {
        Scanner::new(input, config)
            .scan()
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    fn final_state(input: &str, config: &DialectConfiguration) -> ScannerState {
        let mut scanner = Scanner::new(input, config);
        while scanner.step() {}
        scanner.state().clone()
    }

    #[test]
    fn test_dollar_tag_matching() {
        assert_eq!(match_dollar_tag("$$ body"), Some(""));
        assert_eq!(match_dollar_tag("$fn$ body"), Some("fn"));
        assert_eq!(match_dollar_tag("$1"), None);
        assert_eq!(match_dollar_tag("$1$"), None);
        assert_eq!(match_dollar_tag("$a b$"), None);
        assert_eq!(closing_dollar_len("$fn$;", "fn"), Some(4));
        assert_eq!(closing_dollar_len("$fnx$", "fn"), None);
    }

    #[test]
    fn test_unterminated_string_extends_to_end() {
        let config = Dialect::MySql.config();
        assert_eq!(texts("SELECT 'abc; SELECT 2", config), vec!["SELECT 'abc; SELECT 2"]);
        assert_eq!(
            final_state("SELECT 'abc", config).mode,
            ScanMode::InStringLiteral('\'')
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let config = Dialect::Postgres.config();
        let state = final_state("SELECT 1 /* a /* b */ ; ", config);
        assert_eq!(state.mode, ScanMode::InBlockComment { delimiter: 0, depth: 1 });
        assert_eq!(texts("SELECT 1 /* a /* b */ ; ", config), vec!["SELECT 1 /* a /* b */ ;"]);
    }

    #[test]
    fn test_nested_block_comment() {
        let config = Dialect::Postgres.config();
        assert_eq!(
            texts("SELECT /* a /* b; */ c; */ 1; SELECT 2", config),
            vec!["SELECT /* a /* b; */ c; */ 1", "SELECT 2"]
        );
    }

    #[test]
    fn test_non_nestable_block_comment() {
        let config = Dialect::MySql.config();
        assert_eq!(
            texts("SELECT /* a /* b; */ c; SELECT 2", config),
            vec!["SELECT /* a /* b; */ c", "SELECT 2"]
        );
    }

    #[test]
    fn test_backslash_escape_in_mysql_string() {
        let config = Dialect::MySql.config();
        assert_eq!(
            texts(r"SELECT 'it\'s; ok'; SELECT 2", config),
            vec![r"SELECT 'it\'s; ok'", "SELECT 2"]
        );
    }

    #[test]
    fn test_no_backslash_escape_in_postgres_string() {
        let config = Dialect::Postgres.config();
        assert_eq!(
            texts(r"SELECT 'a\'; SELECT 2", config),
            vec![r"SELECT 'a\'", "SELECT 2"]
        );
    }

    #[test]
    fn test_doubled_string_quote() {
        let config = Dialect::Generic.config();
        assert_eq!(
            texts("SELECT 'it''s; fine'; SELECT 2", config),
            vec!["SELECT 'it''s; fine'", "SELECT 2"]
        );
    }

    #[test]
    fn test_bracket_escape() {
        let config = Dialect::MsSql
            .config()
            .to_builder()
            .allow_semicolon_inside_bracketed_identifier(true)
            .build()
            .unwrap();
        assert_eq!(
            texts("SELECT [a]];b]; SELECT 2", &config),
            vec!["SELECT [a]];b]", "SELECT 2"]
        );
    }

    #[test]
    fn test_bracket_without_tolerance_splits() {
        let config = Dialect::MsSql.config();
        assert_eq!(
            texts("CREATE TABLE [a;1]", config),
            vec!["CREATE TABLE [a", "1]"]
        );
        assert_eq!(final_state("CREATE TABLE [a;1]", config).mode, ScanMode::Normal);
    }

    #[test]
    fn test_dollar_quote_with_tag() {
        let config = Dialect::Postgres.config();
        assert_eq!(
            texts("CREATE FUNCTION f() AS $body$ SELECT 1; $$ x; $body$; SELECT 2", config),
            vec!["CREATE FUNCTION f() AS $body$ SELECT 1; $$ x; $body$", "SELECT 2"]
        );
    }

    #[test]
    fn test_positional_parameter_is_not_dollar_quote() {
        let config = Dialect::Postgres.config();
        assert_eq!(
            texts("SELECT $1; SELECT $2", config),
            vec!["SELECT $1", "SELECT $2"]
        );
    }

    #[test]
    fn test_delimiter_requires_line_start() {
        let config = Dialect::MySql.config();
        assert_eq!(
            texts("SELECT 1 DELIMITER $$; SELECT 2", config),
            vec!["SELECT 1 DELIMITER $$", "SELECT 2"]
        );
    }

    #[test]
    fn test_delimiter_without_value_is_text() {
        let config = Dialect::MySql.config();
        assert_eq!(texts("DELIMITER\nSELECT 1;", config), vec!["DELIMITER\nSELECT 1"]);
        assert_eq!(final_state("DELIMITER   \n", config).active_separator, ";");
    }

    #[test]
    fn test_delimiter_changes_active_separator() {
        let config = Dialect::MySql.config();
        let state = final_state("delimiter //\nSELECT 1//", config);
        assert_eq!(state.active_separator, "//");
        assert_eq!(state.mode, ScanMode::Normal);
    }

    #[test]
    fn test_go_inside_statement_line_is_text() {
        let config = Dialect::MsSql.config();
        assert_eq!(texts("SELECT go\nFROM t", config), vec!["SELECT go\nFROM t"]);
        assert_eq!(texts("SELECT 1\n  GO  \nSELECT 2", config), vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(texts("SELECT 1\nGO 5\n", config), vec!["SELECT 1\nGO 5"]);
    }

    #[test]
    fn test_go_inside_comment_is_text() {
        let config = Dialect::MsSql.config();
        assert_eq!(
            texts("SELECT 1 /*\nGO\n*/\nGO\nSELECT 2", config),
            vec!["SELECT 1 /*\nGO\n*/", "SELECT 2"]
        );
    }

    #[test]
    fn test_balance_depth_tracking() {
        let config = Dialect::DocumentCommand.config();
        let state = final_state("db.c.find({a: [1, 2", config);
        assert_eq!(state.depth, 3);
        assert_eq!(final_state("db.c.find()})]", config).depth, 0);
    }

    #[test]
    fn test_balance_ignores_braces_in_strings_and_comments() {
        let config = Dialect::DocumentCommand.config();
        assert_eq!(
            texts("db.c.insert({s: '}'}); // ({\ndb.c.find()", config),
            vec!["db.c.insert({s: '}'})", "// ({\ndb.c.find()"]
        );
    }

    #[test]
    fn test_multichar_separator() {
        let config = DialectConfiguration::builder()
            .statement_separator("$$")
            .string_quotes(['\''])
            .build()
            .unwrap();
        assert_eq!(texts("a $$ b '$$' $$c", &config), vec!["a", "b '$$'", "c"]);
    }
}
