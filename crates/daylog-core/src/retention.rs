//! Log retention and cleanup implementation

use crate::{naming::LOG_SUFFIX, Error, Result};
use chrono::{DateTime, Days, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Period between background sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deletes log files whose modification time is older than the retention
/// window.
///
/// The sweeper does not coordinate with the writer. Today's active file is
/// assumed to be younger than any cutoff; a backdated active file under a
/// very short window could be unlinked while still open.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    log_dir: PathBuf,
    max_age_days: u32,
}

impl RetentionSweeper {
    /// Create a sweeper for `log_dir`; `max_age_days == 0` disables it
    pub fn new(log_dir: PathBuf, max_age_days: u32) -> Self {
        Self {
            log_dir,
            max_age_days,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_age_days > 0
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Oldest modification time that survives a sweep run at `now`.
    ///
    /// Calendar-day subtraction, so a window spanning a DST change still
    /// lands on the same wall-clock time. `None` when the window reaches
    /// past the representable calendar.
    pub fn cutoff(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        now.checked_sub_days(Days::new(u64::from(self.max_age_days)))
    }

    /// Run one sweep against the current time
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Local::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Local>) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        if !self.is_enabled() {
            return Ok(report);
        }

        let Some(cutoff) = self.cutoff(now) else {
            debug!(
                daylog.event = "retention_window_unbounded",
                max_age_days = self.max_age_days,
                "Retention window exceeds the calendar, nothing to remove"
            );
            return Ok(report);
        };

        let mut entries = tokio::fs::read_dir(&self.log_dir)
            .await
            .map_err(|e| Error::Retention {
                message: format!("failed to list {}: {}", self.log_dir.display(), e),
            })?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::Retention {
                        message: format!("failed to list {}: {}", self.log_dir.display(), e),
                    })
                }
            };

            let is_log = entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.ends_with(LOG_SUFFIX));
            if !is_log {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let modified: DateTime<Local> = match metadata.modified() {
                Ok(modified) => modified.into(),
                Err(_) => continue,
            };

            report.files_scanned += 1;

            if modified >= cutoff {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(_) => {
                    report.files_removed += 1;
                    info!(
                        daylog.event = "old_log_removed",
                        file = %path.display(),
                        modified = %modified,
                        "Removed old log file"
                    );
                }
                Err(e) => {
                    report.removal_failures += 1;
                    warn!(
                        daylog.event = "log_removal_failed",
                        file = %path.display(),
                        error = %e,
                        "Failed to remove old log file"
                    );
                }
            }
        }

        debug!(
            daylog.event = "retention_sweep_completed",
            log_dir = %self.log_dir.display(),
            max_age_days = self.max_age_days,
            files_scanned = report.files_scanned,
            files_removed = report.files_removed,
            removal_failures = report.removal_failures,
            "Retention sweep completed"
        );

        Ok(report)
    }

    /// Sweep every `period` on a background task until `shutdown` fires.
    ///
    /// The first sweep runs one full period after the call.
    pub fn spawn(self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = sweep_ticker(period);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!(
                                daylog.event = "retention_sweep_failed",
                                error = %e,
                                "Periodic cleanup failed"
                            );
                        }
                    }
                }
            }

            debug!(
                daylog.event = "retention_sweeper_stopped",
                log_dir = %self.log_dir.display(),
                "Retention sweeper stopped"
            );
        })
    }
}

/// Ticker whose first tick is one `period` away. Ticks missed while the
/// host was suspended collapse into a single sweep.
fn sweep_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Outcome of a single sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular `.log` files whose age was checked
    pub files_scanned: u32,
    pub files_removed: u32,
    pub removal_failures: u32,
}
