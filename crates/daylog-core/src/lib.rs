//! # Daylog Core
//!
//! File-backed logging with daily and size-based rotation and background
//! retention.
//!
//! ## Features
//!
//! - **Leveled Logging**: `DEBUG`, `INFO`, `WARNING`, `ERROR` and `FATAL` with a minimum level filter
//! - **Structured Fields**: optional key/value fields rendered as text or JSON
//! - **Daily Files**: one `<year>-<month>-<day>_<seq>.log` series per calendar day
//! - **Size Ceiling**: same-day rotation to the next sequence number once a file is full
//! - **Retention**: old log files are swept at startup and every 24 hours
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daylog_core::{FileLogger, Logger, LoggerConfig};
//!
//! #[tokio::main]
//! async fn main() -> daylog_core::Result<()> {
//!     let config = LoggerConfig::for_app(".myapp")?;
//!     let logger = FileLogger::new(config).await?;
//!
//!     logger.info("application started");
//!     logger.close()
//! }
//! ```

pub mod config;
pub mod formatters;
pub mod logger;
pub mod naming;
pub mod retention;
pub mod rotation;
pub mod selection;
pub mod testing;


pub use config::{LogFormat, LogLevel, LoggerConfig};
pub use formatters::{Fields, LineFormatter, LogEvent};
pub use logger::{FileLogger, Logger};
pub use retention::{RetentionSweeper, SweepReport, SWEEP_INTERVAL};
pub use rotation::{RotatingFileWriter, MAX_FILE_SIZE_BYTES};
pub use testing::RecordingLogger;

use std::path::PathBuf;

/// Result type for logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Logger-specific errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed creating log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log rotation error: {message}")]
    Rotation { message: String },

    #[error("Retention sweep error: {message}")]
    Retention { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logger is closed")]
    Closed,
}
