//! Logger facade combining level filtering, formatting, rotation and retention

use crate::{
    config::{LogLevel, LoggerConfig},
    formatters::{Fields, LineFormatter, LogEvent},
    retention::{RetentionSweeper, SWEEP_INTERVAL},
    rotation::RotatingFileWriter,
    Error, Result,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Capability set callers depend on instead of a concrete logger
pub trait Logger: Send + Sync {
    fn debug_with(&self, message: &str, fields: Fields);
    fn info_with(&self, message: &str, fields: Fields);
    fn warn_with(&self, message: &str, fields: Fields);
    fn error_with(&self, message: &str, fields: Fields);

    /// Log at fatal level, then terminate. Never returns.
    fn fatal_with(&self, message: &str, fields: Fields) -> !;

    /// Stop background work and release the log file. Idempotent.
    fn close(&self) -> Result<()>;

    fn debug(&self, message: &str) {
        self.debug_with(message, Fields::new());
    }

    fn info(&self, message: &str) {
        self.info_with(message, Fields::new());
    }

    fn warn(&self, message: &str) {
        self.warn_with(message, Fields::new());
    }

    fn error(&self, message: &str) {
        self.error_with(message, Fields::new());
    }

    fn fatal(&self, message: &str) -> ! {
        self.fatal_with(message, Fields::new())
    }
}

/// File-backed logger.
///
/// Lines go to `<base_dir>/logs/<year>-<month>-<day>_<seq>.log`. Every level
/// except debug is echoed to the `tracing` diagnostic sink under the
/// `daylog::echo` target; debug is echoed only in dev mode.
///
/// After [`close`](Logger::close) the logger keeps echoing but writes
/// nothing to disk, and each dropped line is reported as a warning.
pub struct FileLogger {
    dev_mode: bool,
    min_level: LogLevel,
    include_timestamps: bool,
    formatter: LineFormatter,
    log_dir: PathBuf,
    writer: Mutex<Option<RotatingFileWriter>>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl FileLogger {
    /// Create the log directory, open today's file, run the first retention
    /// sweep and start the periodic one.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new(config: LoggerConfig) -> Result<Self> {
        config.validate()?;

        if config.dev_mode {
            info!(
                daylog.event = "dev_mode",
                "logger running in development mode"
            );
        }

        let log_dir = config.log_dir();
        tokio::fs::create_dir_all(&log_dir)
            .await
            .map_err(|source| Error::Directory {
                path: log_dir.clone(),
                source,
            })?;

        let writer = {
            let log_dir = log_dir.clone();
            let max_size_bytes = config.max_file_size_bytes;
            tokio::task::spawn_blocking(move || {
                RotatingFileWriter::open_today(log_dir, max_size_bytes)
            })
            .await
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))??
        };

        let sweeper = RetentionSweeper::new(log_dir.clone(), config.max_age_days);
        if let Err(e) = sweeper.sweep().await {
            warn!(
                daylog.event = "retention_sweep_failed",
                error = %e,
                "failed to cleanup old logs"
            );
        }

        let shutdown = CancellationToken::new();
        let sweeper_task = if sweeper.is_enabled() {
            Some(sweeper.spawn(SWEEP_INTERVAL, shutdown.clone()))
        } else {
            None
        };

        info!(
            daylog.event = "logger_initialized",
            log_dir = %log_dir.display(),
            file_path = %writer.current_path().display(),
            min_level = %config.min_level,
            max_age_days = config.max_age_days,
            "File logger initialized"
        );

        Ok(Self {
            dev_mode: config.dev_mode,
            min_level: config.min_level,
            include_timestamps: config.include_timestamps,
            formatter: LineFormatter::new(config.format),
            log_dir,
            writer: Mutex::new(Some(writer)),
            shutdown,
            sweeper: Mutex::new(sweeper_task),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Path of the active file, `None` once closed
    pub fn current_file_path(&self) -> Option<PathBuf> {
        self.lock_writer()
            .as_ref()
            .map(|writer| writer.current_path().to_path_buf())
    }

    pub fn is_closed(&self) -> bool {
        self.lock_writer().is_none()
    }

    /// Close, then wait for the background sweeper to exit
    pub async fn close_and_wait(&self) -> Result<()> {
        let task = self.take_sweeper();
        let result = Logger::close(self);

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(
                    daylog.event = "retention_sweeper_join_failed",
                    error = %e,
                    "Retention sweeper did not exit cleanly"
                );
            }
        }

        result
    }

    fn log(&self, level: LogLevel, message: &str, fields: Fields) {
        if level < self.min_level {
            return;
        }

        let fields = if fields.is_empty() { None } else { Some(fields) };
        let event = LogEvent::new(level, message, fields);
        let line = self.formatter.format(&event);

        self.write_to_file(&event, &line);

        if level != LogLevel::Debug || self.dev_mode {
            echo(level, &line);
        }
    }

    fn write_to_file(&self, event: &LogEvent, line: &str) {
        let stamped;
        let line = if self.include_timestamps {
            stamped = format!("{} {}", event.timestamp().format("%Y/%m/%d %H:%M:%S"), line);
            stamped.as_str()
        } else {
            line
        };

        let result = match self.lock_writer().as_mut() {
            Some(writer) => writer.write_line(line),
            None => Err(Error::Closed),
        };

        match result {
            Ok(()) => {}
            Err(e @ Error::Rotation { .. }) => {
                tracing::error!(
                    daylog.event = "log_rotation_failed",
                    error = %e,
                    "failed refreshing log file, line dropped"
                );
            }
            Err(Error::Closed) => {
                warn!(
                    daylog.event = "write_after_close",
                    "logger is closed, line dropped"
                );
            }
            Err(e) => {
                tracing::error!(
                    daylog.event = "log_write_failed",
                    error = %e,
                    "failed writing log line"
                );
            }
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<RotatingFileWriter>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_sweeper(&self) -> Option<JoinHandle<()>> {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Logger for FileLogger {
    fn debug_with(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Debug, message, fields);
    }

    fn info_with(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Info, message, fields);
    }

    fn warn_with(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Warn, message, fields);
    }

    fn error_with(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Error, message, fields);
    }

    fn fatal_with(&self, message: &str, fields: Fields) -> ! {
        self.log(LogLevel::Fatal, message, fields);

        if let Err(e) = Logger::close(self) {
            tracing::error!(
                daylog.event = "log_close_failed",
                error = %e,
                "failed to flush log file before exit"
            );
        }

        std::process::exit(1)
    }

    fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        // The task exits once it observes the cancellation.
        drop(self.take_sweeper());

        let mut writer = self.lock_writer();
        match writer.take() {
            Some(active) => {
                let path = active.current_path().to_path_buf();
                active.close()?;
                info!(
                    daylog.event = "logger_closed",
                    file_path = %path.display(),
                    "File logger closed"
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn echo(level: LogLevel, line: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: "daylog::echo", "{}", line),
        LogLevel::Info => tracing::info!(target: "daylog::echo", "{}", line),
        LogLevel::Warn => tracing::warn!(target: "daylog::echo", "{}", line),
        LogLevel::Error | LogLevel::Fatal => tracing::error!(target: "daylog::echo", "{}", line),
    }
}
