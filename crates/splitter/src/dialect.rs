use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::options::{DialectConfiguration, SplittingStrategy};

/// Named dialect presets.
///
/// Presets are plain [`DialectConfiguration`] values; the scanner never looks
/// at which preset it was handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Generic,
    MySql,
    MsSql,
    Postgres,
    DocumentCommand,
    NoSplit,
}

static GENERIC: Lazy<DialectConfiguration> = Lazy::new(|| {
    preset(
        DialectConfiguration::builder()
            .string_quotes(['\''])
            .identifier_quotes(['"'])
            .build(),
    )
});

static MYSQL: Lazy<DialectConfiguration> = Lazy::new(|| {
    preset(
        DialectConfiguration::builder()
            .string_quotes(['\'', '"'])
            .string_backslash_escapes(true)
            .identifier_quotes(['`'])
            .line_comment("--")
            .line_comment("#")
            .block_comment("/*", "*/", false)
            .custom_delimiter_command("DELIMITER")
            .build(),
    )
});

static MSSQL: Lazy<DialectConfiguration> = Lazy::new(|| {
    preset(
        DialectConfiguration::builder()
            .string_quotes(['\''])
            .identifier_quotes(['"', '['])
            .line_comment("--")
            .block_comment("/*", "*/", true)
            .line_separator_keyword("GO")
            .build(),
    )
});

static POSTGRES: Lazy<DialectConfiguration> = Lazy::new(|| {
    preset(
        DialectConfiguration::builder()
            .string_quotes(['\''])
            .identifier_quotes(['"'])
            .line_comment("--")
            .block_comment("/*", "*/", true)
            .dollar_quotes(true)
            .build(),
    )
});

static DOCUMENT_COMMAND: Lazy<DialectConfiguration> = Lazy::new(|| {
    preset(
        DialectConfiguration::builder()
            .splitting_strategy(SplittingStrategy::Balance)
            .string_quotes(['\'', '"', '`'])
            .line_comment("//")
            .block_comment("/*", "*/", false)
            .build(),
    )
});

static NO_SPLIT: Lazy<DialectConfiguration> =
    Lazy::new(|| preset(DialectConfiguration::builder().no_split(true).build()));

fn preset(config: Result<DialectConfiguration, crate::ConfigError>) -> DialectConfiguration {
    match config {
        Ok(config) => config,
        Err(e) => unreachable!("built-in dialect preset is invalid: {}", e),
    }
}

impl Dialect {
    pub fn all() -> &'static [Dialect] {
        &[
            Dialect::Generic,
            Dialect::MySql,
            Dialect::MsSql,
            Dialect::Postgres,
            Dialect::DocumentCommand,
            Dialect::NoSplit,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Dialect::Generic => "generic",
            Dialect::MySql => "mysql",
            Dialect::MsSql => "mssql",
            Dialect::Postgres => "postgres",
            Dialect::DocumentCommand => "document",
            Dialect::NoSplit => "nosplit",
        }
    }

    /// Parse a preset name (case-insensitive, common aliases accepted).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" | "sql" => Some(Dialect::Generic),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "mssql" | "tsql" | "sqlserver" => Some(Dialect::MsSql),
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "document" | "mongo" | "mongodb" => Some(Dialect::DocumentCommand),
            "nosplit" | "none" => Some(Dialect::NoSplit),
            _ => None,
        }
    }

    /// Preset used for a database engine, by the engine's display name.
    ///
    /// Engines without special lexical rules map to [`Dialect::Generic`];
    /// line-oriented engines (Redis) are not split at all. Engines this crate
    /// does not know return `None`.
    pub fn for_engine(engine: &str) -> Option<Self> {
        let dialect = match engine.to_lowercase().as_str() {
            "mysql" | "mariadb" | "clickhouse" => Dialect::MySql,
            "mssql" | "sqlserver" => Dialect::MsSql,
            "postgresql" | "postgres" | "cockroachdb" | "redshift" => Dialect::Postgres,
            "sqlite" | "oracle" | "duckdb" => Dialect::Generic,
            "mongodb" | "mongo" => Dialect::DocumentCommand,
            "redis" => Dialect::NoSplit,
            _ => return None,
        };
        Some(dialect)
    }

    pub fn config(&self) -> &'static DialectConfiguration {
        match self {
            Dialect::Generic => &GENERIC,
            Dialect::MySql => &MYSQL,
            Dialect::MsSql => &MSSQL,
            Dialect::Postgres => &POSTGRES,
            Dialect::DocumentCommand => &DOCUMENT_COMMAND,
            Dialect::NoSplit => &NO_SPLIT,
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_build() {
        for dialect in Dialect::all() {
            let config = dialect.config();
            assert!(!config.statement_separator().is_empty(), "{}", dialect.as_str());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for dialect in Dialect::all() {
            assert_eq!(Dialect::from_str(dialect.as_str()), Some(*dialect));
        }
        assert_eq!(Dialect::from_str("PostgreSQL"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_str("oracle"), None);
    }

    #[test]
    fn test_for_engine() {
        assert_eq!(Dialect::for_engine("MySQL"), Some(Dialect::MySql));
        assert_eq!(Dialect::for_engine("ClickHouse"), Some(Dialect::MySql));
        assert_eq!(Dialect::for_engine("MSSQL"), Some(Dialect::MsSql));
        assert_eq!(Dialect::for_engine("PostgreSQL"), Some(Dialect::Postgres));
        assert_eq!(Dialect::for_engine("SQLite"), Some(Dialect::Generic));
        assert_eq!(Dialect::for_engine("Oracle"), Some(Dialect::Generic));
        assert_eq!(Dialect::for_engine("MongoDB"), Some(Dialect::DocumentCommand));
        assert_eq!(Dialect::for_engine("Redis"), Some(Dialect::NoSplit));
        assert_eq!(Dialect::for_engine("Cassandra"), None);
        assert_eq!(Dialect::for_engine(""), None);
    }

    #[test]
    fn test_preset_rules() {
        let mysql = Dialect::MySql.config();
        assert_eq!(mysql.custom_delimiter_command(), Some("DELIMITER"));
        assert_eq!(mysql.identifier_quote_chars(), &['`']);

        let mssql = Dialect::MsSql.config();
        assert_eq!(mssql.line_separator_keyword(), Some("GO"));
        assert!(!mssql.allow_semicolon_inside_bracketed_identifier());

        assert!(Dialect::Postgres.config().dollar_quote_supported());
        assert_eq!(
            Dialect::DocumentCommand.config().splitting_strategy(),
            SplittingStrategy::Balance
        );
        assert!(Dialect::NoSplit.config().no_split());
    }
}
