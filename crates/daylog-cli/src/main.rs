use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use daylog_core::{
    selection, Fields, FileLogger, LogLevel, Logger, LoggerConfig, RetentionSweeper,
};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "FILES:\n  Logs are written to <base dir>/logs/<year>-<month>-<day>_<seq>.log.\n  A new file is started every calendar day and whenever the current one reaches the size ceiling."
)]
struct Cli {
    /// Configuration file path
    #[arg(long, help = "Path to configuration file")]
    config: Option<PathBuf>,

    /// Application directory, relative to the home directory
    #[arg(long, help = "Application directory relative to the home directory")]
    app_dir: Option<PathBuf>,

    /// Base directory override
    #[arg(
        long,
        conflicts_with = "app_dir",
        help = "Use this base directory as-is instead of resolving against home"
    )]
    base_dir: Option<PathBuf>,

    /// Development mode
    #[arg(long, help = "Enable development mode (debug lines are echoed)")]
    dev: bool,

    /// Retention window
    #[arg(long, help = "Delete log files older than this many days (0 disables)")]
    max_age_days: Option<u32>,

    /// Set log level (debug, info, warn, error, fatal)
    #[arg(long, help = "Minimum level written to the log file")]
    log_level: Option<String>,

    /// Set log format (text, json)
    #[arg(long, help = "Set log line format")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a single line to today's log file
    Write {
        /// Severity (debug, info, warn, error, fatal)
        level: String,

        /// Message text
        message: String,

        /// Structured field, may be repeated
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Run a single retention sweep and print what it did
    Sweep,

    /// Print the path the next line would be written to, without touching
    /// the log directory
    Current,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = resolve_config(&cli).await?;

    init_tracing(config.dev_mode);
    debug!(
        daylog.event = "config_resolved",
        log_dir = %config.log_dir().display(),
        min_level = %config.min_level,
        max_age_days = config.max_age_days,
        "Configuration resolved"
    );

    match cli.command {
        Command::Write {
            level,
            message,
            fields,
        } => {
            let level: LogLevel = level.parse()?;
            let fields = parse_fields(&fields)?;

            let logger = FileLogger::new(config)
                .await
                .context("failed to create logger")?;

            match level {
                LogLevel::Debug => logger.debug_with(&message, fields),
                LogLevel::Info => logger.info_with(&message, fields),
                LogLevel::Warn => logger.warn_with(&message, fields),
                LogLevel::Error => logger.error_with(&message, fields),
                LogLevel::Fatal => logger.fatal_with(&message, fields),
            }

            logger.close_and_wait().await?;
        }
        Command::Sweep => {
            let sweeper = RetentionSweeper::new(config.log_dir(), config.max_age_days);
            if !sweeper.is_enabled() {
                println!("retention disabled (max_age_days = 0)");
                return Ok(());
            }

            let report = sweeper.sweep().await.context("retention sweep failed")?;
            debug!(
                daylog.event = "manual_sweep_completed",
                files_removed = report.files_removed,
                "Manual retention sweep completed"
            );
            println!(
                "scanned {} removed {} failed {}",
                report.files_scanned, report.files_removed, report.removal_failures
            );
        }
        Command::Current => {
            let path = selection::peek_today_file(&config.log_dir(), config.max_file_size_bytes)
                .context("failed to inspect log directory")?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Config file (or defaults) with environment overrides, then flags
async fn resolve_config(cli: &Cli) -> Result<LoggerConfig> {
    let mut config = LoggerConfig::load(cli.config.as_deref())
        .await
        .context("failed to load configuration")?;

    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    } else if let Some(app_dir) = &cli.app_dir {
        config.base_dir = LoggerConfig::for_app(app_dir)?.base_dir;
    }

    if cli.dev {
        config.dev_mode = true;
    }

    if let Some(days) = cli.max_age_days {
        config.max_age_days = days;
    }

    if let Some(level) = &cli.log_level {
        config.min_level = level.parse()?;
    }

    if let Some(format) = &cli.log_format {
        config.format = format.parse()?;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(dev_mode: bool) {
    let default_directives = if dev_mode {
        "debug"
    } else {
        "warn,daylog::echo=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Parse `key=value` pairs; values that parse as JSON scalars keep their
/// type, everything else is a string.
fn parse_fields(raw: &[String]) -> Result<Fields> {
    let mut fields = Fields::new();

    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid field '{}', expected KEY=VALUE", pair);
        };
        if key.is_empty() {
            bail!("invalid field '{}', key is empty", pair);
        }

        let value = match serde_json::from_str::<Value>(value) {
            Ok(parsed @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => {
                parsed
            }
            _ => Value::String(value.to_string()),
        };

        fields.insert(key.to_string(), value);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fields_keeps_scalar_types() {
        let raw = vec![
            "user_id=123".to_string(),
            "action=login".to_string(),
            "ip=192.168.1.1".to_string(),
            "admin=false".to_string(),
            "session=null".to_string(),
            "note=a=b".to_string(),
        ];

        let fields = parse_fields(&raw).unwrap();
        assert_eq!(fields["user_id"], json!(123));
        assert_eq!(fields["action"], json!("login"));
        assert_eq!(fields["ip"], json!("192.168.1.1"));
        assert_eq!(fields["admin"], json!(false));
        assert_eq!(fields["session"], Value::Null);
        assert_eq!(fields["note"], json!("a=b"));
    }

    #[test]
    fn test_parse_fields_rejects_malformed_pairs() {
        assert!(parse_fields(&["novalue".to_string()]).is_err());
        assert!(parse_fields(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_write_command() {
        let cli = Cli::try_parse_from([
            "daylog",
            "--base-dir",
            "/tmp/app",
            "--log-format",
            "json",
            "write",
            "info",
            "user logged in",
            "--field",
            "user_id=123",
            "-f",
            "action=login",
        ])
        .unwrap();

        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/app")));
        match cli.command {
            Command::Write {
                level,
                message,
                fields,
            } => {
                assert_eq!(level, "info");
                assert_eq!(message, "user logged in");
                assert_eq!(fields, vec!["user_id=123", "action=login"]);
            }
            _ => panic!("expected write command"),
        }
    }

    #[test]
    fn test_base_dir_conflicts_with_app_dir() {
        let result = Cli::try_parse_from([
            "daylog",
            "--base-dir",
            "/tmp/app",
            "--app-dir",
            ".app",
            "current",
        ]);
        assert!(result.is_err());
    }
}
