//! Startup selection of the file to append to

use crate::{
    naming::{date_stamp, LogFileName},
    rotation::ActiveFile,
    Error, Result,
};
use chrono::{Local, NaiveDate};
use std::io;
use std::path::{Path, PathBuf};

/// Open today's latest log file in `log_dir`, creating `<today>_1.log` when
/// none exists yet.
pub fn select_or_create_today_file(log_dir: &Path) -> Result<ActiveFile> {
    select_or_create_file_for(log_dir, Local::now().date_naive())
}

/// Open the latest log file for `date`, creating `<date>_1.log` when none
/// exists yet. Existing content is never truncated.
pub fn select_or_create_file_for(log_dir: &Path, date: NaiveDate) -> Result<ActiveFile> {
    let name = latest_file_name(log_dir, date)?;
    let active = ActiveFile::open(log_dir, name)?;

    tracing::debug!(
        daylog.event = "log_file_selected",
        file_path = %active.path().display(),
        "Log file selected"
    );

    Ok(active)
}

/// Name of the highest-sequence log file for `date` in `log_dir`.
///
/// Only names that parse as `<stamp>_<seq>.log` with exactly the given
/// date's stamp are considered; anything else is skipped.
pub fn latest_file_name(log_dir: &Path, date: NaiveDate) -> Result<LogFileName> {
    let stamp = date_stamp(date);
    let mut latest: Option<LogFileName> = None;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();

        let candidate = match file_name.to_str().and_then(LogFileName::parse) {
            Some(name) if name.stamp == stamp => name,
            _ => continue,
        };

        let is_newer = latest
            .as_ref()
            .map_or(true, |current| candidate.sequence > current.sequence);
        if is_newer {
            latest = Some(candidate);
        }
    }

    Ok(latest.unwrap_or_else(|| LogFileName::first_of(date)))
}

/// Path the next line written today would land in, without creating or
/// opening anything.
///
/// A missing `log_dir` yields `<today>_1.log`.
pub fn peek_today_file(log_dir: &Path, max_size_bytes: u64) -> Result<PathBuf> {
    let name = peek_file_name_for(log_dir, Local::now().date_naive(), max_size_bytes)?;
    Ok(log_dir.join(name.to_string()))
}

pub fn peek_file_name_for(
    log_dir: &Path,
    date: NaiveDate,
    max_size_bytes: u64,
) -> Result<LogFileName> {
    if !log_dir.is_dir() {
        return Ok(LogFileName::first_of(date));
    }

    let latest = latest_file_name(log_dir, date)?;
    let size = match std::fs::metadata(log_dir.join(latest.to_string())) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(latest),
        Err(e) => return Err(e.into()),
    };

    if size < max_size_bytes {
        return Ok(latest);
    }

    latest.next().ok_or_else(|| Error::Rotation {
        message: format!("no sequence number left after {}", latest),
    })
}
