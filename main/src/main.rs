//! qsplit - split a query script into statements
//!
//! Reads a script from a file or stdin, splits it with a dialect preset or a
//! JSON dialect configuration, and prints the statements.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use query_splitter::{Dialect, DialectConfiguration, SplitOutput, Statement, StreamSplitter};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "qsplit", about = "Split a query script into statements", version)]
struct Cli {
    /// Script to split (stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Dialect preset or engine name (mysql, mssql, postgres, document, nosplit, ...)
    #[arg(short, long, default_value = "generic", conflicts_with = "config")]
    dialect: String,

    /// JSON dialect configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print statements with their positions as JSON
    #[arg(long)]
    rich: bool,

    /// Print statement texts as a JSON array
    #[arg(long)]
    json: bool,
}

fn main() {
    init_logging();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let reader: Box<dyn BufRead> = match &cli.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open script {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let json = cli.json || config.return_rich_info();
    let mut splitter = StreamSplitter::new(config.clone());
    let mut text = TextWriter::new(&config);
    let mut out = io::stdout().lock();
    let mut collected = Vec::new();

    for line in read_lines(reader) {
        let line = line.context("cannot read script")?;
        // Statements completed by one line all ended under the separator in
        // force before it; a delimiter command flushes before switching.
        let separator = splitter.active_separator().to_string();
        let statements = splitter.push(&line);
        if json {
            collected.extend(statements);
        } else {
            text.write(&mut out, &statements, &separator)?;
        }
    }
    let separator = splitter.active_separator().to_string();
    let statements = splitter.finish();
    if json {
        collected.extend(statements);
    } else {
        text.write(&mut out, &statements, &separator)?;
        text.finish(&mut out)?;
    }

    if json {
        let output = if config.return_rich_info() {
            SplitOutput::Rich(collected)
        } else {
            SplitOutput::Texts(collected.into_iter().map(|s| s.text).collect())
        };
        debug!("Writing {} statements as JSON", output.len());
        serde_json::to_writer_pretty(&mut out, &output)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Dialect configuration from `--config` or `--dialect`, with `--rich` applied.
fn resolve_config(cli: &Cli) -> Result<DialectConfiguration> {
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read configuration {}", path.display()))?;
            DialectConfiguration::from_json(&json)
                .with_context(|| format!("invalid configuration {}", path.display()))?
        }
        None => dialect_by_name(&cli.dialect)?.config().clone(),
    };
    if cli.rich && !config.return_rich_info() {
        return Ok(config.to_builder().return_rich_info(true).build()?);
    }
    Ok(config)
}

/// Preset name first, then engine name.
fn dialect_by_name(name: &str) -> Result<Dialect> {
    if let Some(dialect) = Dialect::from_str(name).or_else(|| Dialect::for_engine(name)) {
        return Ok(dialect);
    }
    let known: Vec<&str> = Dialect::all().iter().map(|d| d.as_str()).collect();
    Err(anyhow!("unknown dialect '{}' (expected one of: {})", name, known.join(", ")))
}

/// Plain-text statement output that can be split again.
///
/// Each statement is terminated by the separator it ended under. When that
/// separator changes, a delimiter command line is written first.
struct TextWriter {
    configured: String,
    current: String,
    delimiter_command: Option<String>,
}

impl TextWriter {
    fn new(config: &DialectConfiguration) -> Self {
        Self {
            configured: config.statement_separator().to_string(),
            current: config.statement_separator().to_string(),
            delimiter_command: config.custom_delimiter_command().map(str::to_string),
        }
    }

    fn write(&mut self, out: &mut dyn Write, statements: &[Statement], separator: &str) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        self.switch_to(out, separator)?;
        for statement in statements {
            writeln!(out, "{}{}", statement.text, self.current)?;
        }
        Ok(())
    }

    /// Restore the configured separator if the output changed it.
    fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        let configured = self.configured.clone();
        self.switch_to(out, &configured)
    }

    fn switch_to(&mut self, out: &mut dyn Write, separator: &str) -> Result<()> {
        if separator == self.current {
            return Ok(());
        }
        if let Some(command) = &self.delimiter_command {
            writeln!(out, "{} {}", command, separator)?;
            self.current = separator.to_string();
        }
        Ok(())
    }
}

/// Lines with their terminators kept, so positions stay exact.
fn read_lines(mut reader: Box<dyn BufRead>) -> impl Iterator<Item = io::Result<String>> {
    std::iter::from_fn(move || {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(e) => Some(Err(e)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_splitter::split_texts;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("qsplit").chain(args.iter().copied()))
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(dialect_by_name("MySQL").unwrap(), Dialect::MySql);
        assert_eq!(dialect_by_name("cockroachdb").unwrap(), Dialect::Postgres);
        assert_eq!(dialect_by_name("redis").unwrap(), Dialect::NoSplit);
        assert_eq!(dialect_by_name("sqlite").unwrap(), Dialect::Generic);
        assert_eq!(dialect_by_name("Oracle").unwrap(), Dialect::Generic);
        assert!(dialect_by_name("cassandra").is_err());
    }

    #[test]
    fn test_rich_flag_sets_rich_info() {
        let config = resolve_config(&cli(&["--dialect", "postgres", "--rich"])).unwrap();
        assert!(config.return_rich_info());
        assert!(config.dollar_quote_supported());
    }

    #[test]
    fn test_missing_config_file() {
        let err = resolve_config(&cli(&["--config", "/nonexistent/qsplit.json"])).unwrap_err();
        assert!(err.to_string().contains("cannot read configuration"));
    }

    fn write_text(script: &str, config: &DialectConfiguration) -> String {
        let mut splitter = StreamSplitter::new(config.clone());
        let mut text = TextWriter::new(config);
        let mut out = Vec::new();
        for line in script.split_inclusive('\n') {
            let separator = splitter.active_separator().to_string();
            let statements = splitter.push(line);
            text.write(&mut out, &statements, &separator).unwrap();
        }
        let separator = splitter.active_separator().to_string();
        let statements = splitter.finish();
        text.write(&mut out, &statements, &separator).unwrap();
        text.finish(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_output_keeps_custom_delimiter() {
        let config = Dialect::MySql.config();
        let script = "SELECT 0;\nDELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; END//\nDELIMITER ;\nSELECT 2;\n";
        let output = write_text(script, config);
        assert_eq!(
            output,
            "SELECT 0;\nDELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; END//\nDELIMITER ;\nSELECT 2;\n"
        );
        assert_eq!(split_texts(&output, config), split_texts(script, config));
    }

    #[test]
    fn test_text_output_restores_separator_at_end() {
        let config = Dialect::MySql.config();
        let script = "DELIMITER $$\nSELECT 1$$\n";
        assert_eq!(write_text(script, config), "DELIMITER $$\nSELECT 1$$\nDELIMITER ;\n");
    }

    #[test]
    fn test_dialect_conflicts_with_config() {
        let parsed = Cli::try_parse_from(["qsplit", "--dialect", "mysql", "--config", "a.json"]);
        assert!(parsed.is_err());
    }
}
