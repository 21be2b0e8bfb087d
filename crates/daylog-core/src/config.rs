//! Logger configuration and management

use crate::{rotation::MAX_FILE_SIZE_BYTES, Error, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the directory under the base directory that holds the log files
pub const LOG_DIR_NAME: &str = "logs";

/// Main logger configuration.
///
/// Set once when a [`FileLogger`](crate::FileLogger) is constructed; the
/// logger never re-reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Echo debug lines to the diagnostic sink as well as the file
    pub dev_mode: bool,

    /// Base directory; log files live in `<base_dir>/logs`
    pub base_dir: PathBuf,

    /// Maximum age of log files in days (0 disables retention)
    pub max_age_days: u32,

    /// Events below this level are dropped
    pub min_level: LogLevel,

    /// Output format for log lines
    pub format: LogFormat,

    /// Size ceiling in bytes before same-day rotation
    pub max_file_size_bytes: u64,

    /// Prefix every file line with a local `YYYY/MM/DD HH:MM:SS` stamp
    pub include_timestamps: bool,
}

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Label written at the start of every line
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(Error::Config {
                message: format!("Unknown log level '{}'", s),
            }),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Fatal => tracing::Level::ERROR,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `LEVEL message key=value ...`
    Text,
    /// Single-line JSON object
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(Error::Config {
                message: format!("Unknown log format '{}'", s),
            }),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let base_dir = Self::home_relative(".daylog").unwrap_or_else(|_| PathBuf::from(".daylog"));

        Self {
            dev_mode: false,
            base_dir,
            max_age_days: 30,
            min_level: LogLevel::Info,
            format: LogFormat::Text,
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            include_timestamps: false,
        }
    }
}

impl LoggerConfig {
    /// Default configuration rooted at `<home>/<app_dir>`.
    ///
    /// Fails when the current user's home directory cannot be determined.
    pub fn for_app(app_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            base_dir: Self::home_relative(app_dir)?,
            ..Self::default()
        })
    }

    /// Directory the log files are written to
    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join(LOG_DIR_NAME)
    }

    /// Load configuration from file or create default
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_file.exists() {
            let content = tokio::fs::read_to_string(&config_file).await?;
            toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse logger config: {}", e),
            })?
        } else {
            Self::default()
        };

        config.load_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize logger config: {}", e),
        })?;

        tokio::fs::write(&config_file, content).await?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        if let Ok(dev_mode) = std::env::var("DAYLOG_DEV_MODE") {
            self.dev_mode = dev_mode.parse().unwrap_or(self.dev_mode);
        }

        if let Ok(dir) = std::env::var("DAYLOG_BASE_DIR") {
            self.base_dir = PathBuf::from(dir);
        }

        if let Ok(days) = std::env::var("DAYLOG_MAX_AGE_DAYS") {
            self.max_age_days = days.parse().unwrap_or(self.max_age_days);
        }

        if let Ok(level) = std::env::var("DAYLOG_LOG_LEVEL") {
            self.min_level = level.parse().unwrap_or(self.min_level);
        }

        if let Ok(format) = std::env::var("DAYLOG_LOG_FORMAT") {
            self.format = format.parse().unwrap_or(self.format);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "base_dir must not be empty".to_string(),
            });
        }

        if self.max_file_size_bytes == 0 {
            return Err(Error::Config {
                message: "max_file_size_bytes must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "daylog", "daylog").ok_or_else(|| Error::Config {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(project_dirs.config_dir().join("daylog.toml"))
    }

    fn home_relative(app_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let base_dirs = BaseDirs::new().ok_or_else(|| Error::Config {
            message: "Could not determine the current user's home directory".to_string(),
        })?;

        Ok(base_dirs.home_dir().join(app_dir))
    }
}
