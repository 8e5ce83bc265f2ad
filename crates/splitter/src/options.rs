use serde::{Deserialize, Serialize};

/// Scanning algorithm used to find statement boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplittingStrategy {
    /// Quote/comment aware scanner for SQL dialects.
    #[default]
    Lexical,
    /// Brace/bracket/paren balance scanner for document command languages
    /// (`db.coll.insert({...});`). The separator only counts at depth zero.
    Balance,
}

/// Start/end marker pair of a block comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockCommentDelimiter {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub nestable: bool,
}

impl BlockCommentDelimiter {
    pub fn new(start: impl Into<String>, end: impl Into<String>, nestable: bool) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            nestable,
        }
    }
}

/// Invalid dialect configuration, rejected when the configuration is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptySeparator,
    SeparatorContainsNewline(String),
    InvalidKeyword { field: &'static str, keyword: String },
    InvalidCommentMarker(String),
    InvalidQuoteChar(char),
    AmbiguousQuoteChar(char),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptySeparator => write!(f, "Statement separator must not be empty"),
            ConfigError::SeparatorContainsNewline(sep) => {
                write!(f, "Statement separator must not contain a newline: {:?}", sep)
            }
            ConfigError::InvalidKeyword { field, keyword } => {
                write!(f, "Invalid {}: {:?} (must be non-empty and contain no whitespace)", field, keyword)
            }
            ConfigError::InvalidCommentMarker(marker) => {
                write!(f, "Comment marker must be non-empty and on one line: {:?}", marker)
            }
            ConfigError::InvalidQuoteChar(ch) => write!(f, "Quote character must not be whitespace: {:?}", ch),
            ConfigError::AmbiguousQuoteChar(ch) => {
                write!(f, "Character {:?} is both a string quote and an identifier quote", ch)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse dialect configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Lexical rules of one dialect.
///
/// Immutable once built; every instance has passed [`DialectConfigurationBuilder::build`]
/// validation, including the ones deserialized from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DialectConfigurationBuilder")]
pub struct DialectConfiguration {
    statement_separator: String,
    allow_semicolon_inside_bracketed_identifier: bool,
    string_quote_chars: Vec<char>,
    string_backslash_escapes: bool,
    identifier_quote_chars: Vec<char>,
    line_comment_markers: Vec<String>,
    block_comment_delimiters: Vec<BlockCommentDelimiter>,
    dollar_quote_supported: bool,
    custom_delimiter_command: Option<String>,
    line_separator_keyword: Option<String>,
    splitting_strategy: SplittingStrategy,
    return_rich_info: bool,
    no_split: bool,
    split_by_lines: bool,
    prevent_single_line_split: bool,
}

impl DialectConfiguration {
    pub fn builder() -> DialectConfigurationBuilder {
        DialectConfigurationBuilder::default()
    }

    /// Start a builder from this configuration, e.g. to flip one flag of a preset.
    pub fn to_builder(&self) -> DialectConfigurationBuilder {
        DialectConfigurationBuilder {
            statement_separator: self.statement_separator.clone(),
            allow_semicolon_inside_bracketed_identifier: self.allow_semicolon_inside_bracketed_identifier,
            string_quote_chars: self.string_quote_chars.clone(),
            string_backslash_escapes: self.string_backslash_escapes,
            identifier_quote_chars: self.identifier_quote_chars.clone(),
            line_comment_markers: self.line_comment_markers.clone(),
            block_comment_delimiters: self.block_comment_delimiters.clone(),
            dollar_quote_supported: self.dollar_quote_supported,
            custom_delimiter_command: self.custom_delimiter_command.clone(),
            line_separator_keyword: self.line_separator_keyword.clone(),
            splitting_strategy: self.splitting_strategy,
            return_rich_info: self.return_rich_info,
            no_split: self.no_split,
            split_by_lines: self.split_by_lines,
            prevent_single_line_split: self.prevent_single_line_split,
        }
    }

    /// Parse and validate a JSON dialect configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn statement_separator(&self) -> &str {
        &self.statement_separator
    }

    pub fn allow_semicolon_inside_bracketed_identifier(&self) -> bool {
        self.allow_semicolon_inside_bracketed_identifier
    }

    pub fn string_quote_chars(&self) -> &[char] {
        &self.string_quote_chars
    }

    pub fn string_backslash_escapes(&self) -> bool {
        self.string_backslash_escapes
    }

    pub fn identifier_quote_chars(&self) -> &[char] {
        &self.identifier_quote_chars
    }

    pub fn line_comment_markers(&self) -> &[String] {
        &self.line_comment_markers
    }

    pub fn block_comment_delimiters(&self) -> &[BlockCommentDelimiter] {
        &self.block_comment_delimiters
    }

    pub fn dollar_quote_supported(&self) -> bool {
        self.dollar_quote_supported
    }

    pub fn custom_delimiter_command(&self) -> Option<&str> {
        self.custom_delimiter_command.as_deref()
    }

    pub fn line_separator_keyword(&self) -> Option<&str> {
        self.line_separator_keyword.as_deref()
    }

    pub fn splitting_strategy(&self) -> SplittingStrategy {
        self.splitting_strategy
    }

    pub fn return_rich_info(&self) -> bool {
        self.return_rich_info
    }

    pub fn no_split(&self) -> bool {
        self.no_split
    }

    pub fn split_by_lines(&self) -> bool {
        self.split_by_lines
    }

    pub fn prevent_single_line_split(&self) -> bool {
        self.prevent_single_line_split
    }
}

/// Builder for [`DialectConfiguration`]; also the serde shape of a JSON config.
///
/// The default is a bare dialect: `;` separator and nothing else recognized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectConfigurationBuilder {
    statement_separator: String,
    allow_semicolon_inside_bracketed_identifier: bool,
    string_quote_chars: Vec<char>,
    string_backslash_escapes: bool,
    identifier_quote_chars: Vec<char>,
    line_comment_markers: Vec<String>,
    block_comment_delimiters: Vec<BlockCommentDelimiter>,
    dollar_quote_supported: bool,
    custom_delimiter_command: Option<String>,
    line_separator_keyword: Option<String>,
    splitting_strategy: SplittingStrategy,
    return_rich_info: bool,
    no_split: bool,
    split_by_lines: bool,
    prevent_single_line_split: bool,
}

impl Default for DialectConfigurationBuilder {
    fn default() -> Self {
        Self {
            statement_separator: ";".to_string(),
            allow_semicolon_inside_bracketed_identifier: false,
            string_quote_chars: Vec::new(),
            string_backslash_escapes: false,
            identifier_quote_chars: Vec::new(),
            line_comment_markers: Vec::new(),
            block_comment_delimiters: Vec::new(),
            dollar_quote_supported: false,
            custom_delimiter_command: None,
            line_separator_keyword: None,
            splitting_strategy: SplittingStrategy::Lexical,
            return_rich_info: false,
            no_split: false,
            split_by_lines: false,
            prevent_single_line_split: false,
        }
    }
}

impl DialectConfigurationBuilder {
    pub fn statement_separator(mut self, separator: impl Into<String>) -> Self {
        self.statement_separator = separator.into();
        self
    }

    pub fn allow_semicolon_inside_bracketed_identifier(mut self, allow: bool) -> Self {
        self.allow_semicolon_inside_bracketed_identifier = allow;
        self
    }

    pub fn string_quotes(mut self, quotes: impl IntoIterator<Item = char>) -> Self {
        self.string_quote_chars = quotes.into_iter().collect();
        self
    }

    pub fn string_backslash_escapes(mut self, enabled: bool) -> Self {
        self.string_backslash_escapes = enabled;
        self
    }

    pub fn identifier_quotes(mut self, quotes: impl IntoIterator<Item = char>) -> Self {
        self.identifier_quote_chars = quotes.into_iter().collect();
        self
    }

    pub fn line_comment(mut self, marker: impl Into<String>) -> Self {
        self.line_comment_markers.push(marker.into());
        self
    }

    pub fn block_comment(mut self, start: impl Into<String>, end: impl Into<String>, nestable: bool) -> Self {
        self.block_comment_delimiters
            .push(BlockCommentDelimiter::new(start, end, nestable));
        self
    }

    pub fn dollar_quotes(mut self, supported: bool) -> Self {
        self.dollar_quote_supported = supported;
        self
    }

    pub fn custom_delimiter_command(mut self, keyword: impl Into<String>) -> Self {
        self.custom_delimiter_command = Some(keyword.into());
        self
    }

    pub fn line_separator_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.line_separator_keyword = Some(keyword.into());
        self
    }

    pub fn splitting_strategy(mut self, strategy: SplittingStrategy) -> Self {
        self.splitting_strategy = strategy;
        self
    }

    pub fn return_rich_info(mut self, rich: bool) -> Self {
        self.return_rich_info = rich;
        self
    }

    pub fn no_split(mut self, no_split: bool) -> Self {
        self.no_split = no_split;
        self
    }

    pub fn split_by_lines(mut self, by_lines: bool) -> Self {
        self.split_by_lines = by_lines;
        self
    }

    pub fn prevent_single_line_split(mut self, prevent: bool) -> Self {
        self.prevent_single_line_split = prevent;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<DialectConfiguration, ConfigError> {
        if self.statement_separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.statement_separator.contains('\n') {
            return Err(ConfigError::SeparatorContainsNewline(self.statement_separator));
        }
        validate_keyword("custom delimiter command", self.custom_delimiter_command.as_deref())?;
        validate_keyword("line separator keyword", self.line_separator_keyword.as_deref())?;

        let comment_markers = self.line_comment_markers.iter().chain(
            self.block_comment_delimiters
                .iter()
                .flat_map(|d| [&d.start, &d.end]),
        );
        for marker in comment_markers {
            if marker.is_empty() || marker.contains('\n') {
                return Err(ConfigError::InvalidCommentMarker(marker.clone()));
            }
        }

        for &ch in self.string_quote_chars.iter().chain(&self.identifier_quote_chars) {
            if ch.is_whitespace() {
                return Err(ConfigError::InvalidQuoteChar(ch));
            }
        }
        if let Some(&ch) = self
            .string_quote_chars
            .iter()
            .find(|ch| self.identifier_quote_chars.contains(ch))
        {
            return Err(ConfigError::AmbiguousQuoteChar(ch));
        }

        Ok(DialectConfiguration {
            statement_separator: self.statement_separator,
            allow_semicolon_inside_bracketed_identifier: self.allow_semicolon_inside_bracketed_identifier,
            string_quote_chars: self.string_quote_chars,
            string_backslash_escapes: self.string_backslash_escapes,
            identifier_quote_chars: self.identifier_quote_chars,
            line_comment_markers: self.line_comment_markers,
            block_comment_delimiters: self.block_comment_delimiters,
            dollar_quote_supported: self.dollar_quote_supported,
            custom_delimiter_command: self.custom_delimiter_command,
            line_separator_keyword: self.line_separator_keyword,
            splitting_strategy: self.splitting_strategy,
            return_rich_info: self.return_rich_info,
            no_split: self.no_split,
            split_by_lines: self.split_by_lines,
            prevent_single_line_split: self.prevent_single_line_split,
        })
    }
}

impl TryFrom<DialectConfigurationBuilder> for DialectConfiguration {
    type Error = ConfigError;

    fn try_from(builder: DialectConfigurationBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

fn validate_keyword(field: &'static str, keyword: Option<&str>) -> Result<(), ConfigError> {
    match keyword {
        Some(kw) if kw.is_empty() || kw.chars().any(char::is_whitespace) => Err(ConfigError::InvalidKeyword {
            field,
            keyword: kw.to_string(),
        }),
        _ => Ok(()),
    }
}
