//! Log file rotation implementation

use crate::{naming::LogFileName, selection, Error, Result};
use chrono::{Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default size ceiling before a same-day rotation
pub const MAX_FILE_SIZE_BYTES: u64 = 10_000_000;

/// The open file currently appended to, with its parsed name
#[derive(Debug)]
pub struct ActiveFile {
    path: PathBuf,
    name: LogFileName,
    file: File,
}

impl ActiveFile {
    /// Open `<log_dir>/<name>` for appending, creating it if needed
    pub fn open(log_dir: &Path, name: LogFileName) -> Result<Self> {
        let path = log_dir.join(name.to_string());
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self { path, name, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &LogFileName {
        &self.name
    }

    /// Current size of the file on disk
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Flush to disk and close the descriptor
    pub fn close(self) -> io::Result<()> {
        self.file.sync_all()
    }
}

/// Appends lines to the active log file, swapping it for a new one when the
/// calendar day changes or the size ceiling is reached.
///
/// Not synchronized; the owner is expected to hold a lock around
/// [`write_line`](Self::write_line) so that the rotation check and the write
/// happen atomically.
#[derive(Debug)]
pub struct RotatingFileWriter {
    log_dir: PathBuf,
    max_size_bytes: u64,
    active: ActiveFile,
}

impl RotatingFileWriter {
    /// Open today's latest file in `log_dir`
    pub fn open_today(log_dir: PathBuf, max_size_bytes: u64) -> Result<Self> {
        let active = selection::select_or_create_today_file(&log_dir)?;
        Ok(Self::with_active(log_dir, max_size_bytes, active))
    }

    /// Wrap an already opened file
    pub fn with_active(log_dir: PathBuf, max_size_bytes: u64, active: ActiveFile) -> Self {
        Self {
            log_dir,
            max_size_bytes,
            active,
        }
    }

    /// Path of the file lines are currently appended to
    pub fn current_path(&self) -> &Path {
        self.active.path()
    }

    /// Rotate if needed, then append `line` followed by a newline
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_line_on(line, Local::now().date_naive())
    }

    pub fn write_line_on(&mut self, line: &str, today: NaiveDate) -> Result<()> {
        self.ensure_writable_on(today)?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.active.file.write_all(buf.as_bytes())?;

        Ok(())
    }

    /// Make sure the active file may receive today's next line.
    ///
    /// Returns `true` when the active file was swapped.
    pub fn ensure_writable(&mut self) -> Result<bool> {
        self.ensure_writable_on(Local::now().date_naive())
    }

    pub fn ensure_writable_on(&mut self, today: NaiveDate) -> Result<bool> {
        let next_name = if !self.active.name().is_for(today) {
            LogFileName::first_of(today)
        } else {
            let size = self.active.size().map_err(|e| Error::Rotation {
                message: format!("failed to stat {}: {}", self.active.path().display(), e),
            })?;

            if size < self.max_size_bytes {
                return Ok(false);
            }

            self.active.name().next().ok_or_else(|| Error::Rotation {
                message: format!(
                    "sequence number exhausted for {}",
                    self.active.path().display()
                ),
            })?
        };

        let next = ActiveFile::open(&self.log_dir, next_name).map_err(|e| Error::Rotation {
            message: format!("failed to open new log file: {}", e),
        })?;

        // Swap first so a writable file is always referenced.
        let old = std::mem::replace(&mut self.active, next);
        let old_path = old.path().to_path_buf();

        tracing::info!(
            daylog.event = "log_rotated",
            old_file = %old_path.display(),
            new_file = %self.active.path().display(),
            "Log file rotated"
        );

        if let Err(e) = old.close() {
            tracing::warn!(
                daylog.event = "log_close_failed",
                file = %old_path.display(),
                error = %e,
                "Failed to close old log file"
            );
        }

        Ok(true)
    }

    /// Flush and close the active file
    pub fn close(self) -> Result<()> {
        self.active.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::date_stamp;
    use chrono::Days;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn sized_file(dir: &Path, name: &str, size: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_len(size).unwrap();
    }

    fn writer_for(dir: &Path, name: LogFileName) -> RotatingFileWriter {
        let active = ActiveFile::open(dir, name).unwrap();
        RotatingFileWriter::with_active(dir.to_path_buf(), MAX_FILE_SIZE_BYTES, active)
    }

    fn file_name(writer: &RotatingFileWriter) -> String {
        writer
            .current_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_new_file_on_a_new_day() {
        let temp_dir = TempDir::new().unwrap();
        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let mut writer = writer_for(temp_dir.path(), LogFileName::first_of(yesterday));

        assert!(writer.ensure_writable().unwrap());
        assert_eq!(file_name(&writer), format!("{}_1.log", date_stamp(today())));
    }

    #[test]
    fn test_new_day_resets_sequence_regardless_of_size() {
        let temp_dir = TempDir::new().unwrap();
        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let stale = format!("{}_4.log", date_stamp(yesterday));
        sized_file(temp_dir.path(), &stale, MAX_FILE_SIZE_BYTES + 5);

        let mut writer = writer_for(temp_dir.path(), LogFileName::new(date_stamp(yesterday), 4));
        writer.write_line("INFO after midnight").unwrap();

        assert_eq!(file_name(&writer), format!("{}_1.log", date_stamp(today())));
        assert!(!temp_dir
            .path()
            .join(format!("{}_5.log", date_stamp(yesterday)))
            .exists());
        assert!(!temp_dir
            .path()
            .join(format!("{}_5.log", date_stamp(today())))
            .exists());
        assert_eq!(
            std::fs::metadata(temp_dir.path().join(stale)).unwrap().len(),
            MAX_FILE_SIZE_BYTES + 5
        );
    }

    #[test]
    fn test_no_new_file_below_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let name = format!("{}_1.log", date_stamp(today()));
        sized_file(temp_dir.path(), &name, 500_000);

        let mut writer = writer_for(temp_dir.path(), LogFileName::first_of(today()));
        for _ in 0..3 {
            assert!(!writer.ensure_writable().unwrap());
            writer.write_line("INFO still here").unwrap();
        }

        assert_eq!(file_name(&writer), name);
    }

    #[test]
    fn test_new_file_above_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let stamp = date_stamp(today());
        sized_file(temp_dir.path(), &format!("{}_2.log", stamp), 10_000_001);

        let mut writer = writer_for(temp_dir.path(), LogFileName::new(stamp.clone(), 2));
        assert!(writer.ensure_writable().unwrap());

        assert_eq!(file_name(&writer), format!("{}_3.log", stamp));
    }

    #[test]
    fn test_new_file_at_exact_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let stamp = date_stamp(today());
        sized_file(temp_dir.path(), &format!("{}_1.log", stamp), MAX_FILE_SIZE_BYTES);

        let mut writer = writer_for(temp_dir.path(), LogFileName::first_of(today()));
        assert!(writer.ensure_writable().unwrap());

        assert_eq!(file_name(&writer), format!("{}_2.log", stamp));
    }

    #[test]
    fn test_rotation_appends_to_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let stamp = date_stamp(today());
        let target = temp_dir.path().join(format!("{}_2.log", stamp));
        std::fs::write(&target, "INFO from a previous run\n").unwrap();

        let active = ActiveFile::open(temp_dir.path(), LogFileName::first_of(today())).unwrap();
        let mut writer = RotatingFileWriter::with_active(temp_dir.path().to_path_buf(), 1, active);
        writer.write_line("INFO first").unwrap();
        writer.write_line("INFO second").unwrap();

        assert_eq!(writer.current_path(), target.as_path());
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "INFO from a previous run\nINFO second\n"
        );
    }

    #[test]
    fn test_small_ceiling_rotates_through_sequences() {
        let temp_dir = TempDir::new().unwrap();
        let stamp = date_stamp(today());

        let active = ActiveFile::open(temp_dir.path(), LogFileName::first_of(today())).unwrap();
        let mut writer =
            RotatingFileWriter::with_active(temp_dir.path().to_path_buf(), 20, active);

        for i in 0..6 {
            writer.write_line(&format!("INFO message {:04}", i)).unwrap();
        }

        // 18 bytes per line, so every file holds two lines
        for seq in 1..=3 {
            let content =
                std::fs::read_to_string(temp_dir.path().join(format!("{}_{}.log", stamp, seq)))
                    .unwrap();
            assert_eq!(content.lines().count(), 2, "file {}", seq);
        }
        assert_eq!(file_name(&writer), format!("{}_3.log", stamp));
    }

    #[test]
    fn test_explicit_dates_drive_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let day_one = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let day_two = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let active = ActiveFile::open(temp_dir.path(), LogFileName::new("2025-1-9", 5)).unwrap();
        let mut writer =
            RotatingFileWriter::with_active(temp_dir.path().to_path_buf(), MAX_FILE_SIZE_BYTES, active);

        writer.write_line_on("INFO late", day_one).unwrap();
        assert_eq!(file_name(&writer), "2025-1-9_5.log");

        writer.write_line_on("INFO early", day_two).unwrap();
        assert_eq!(file_name(&writer), "2025-1-10_1.log");
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("2025-1-10_1.log")).unwrap(),
            "INFO early\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rotation_keeps_active_file_and_drops_write() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();

        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let mut writer = writer_for(&log_dir, LogFileName::first_of(yesterday));
        let stale_path = writer.current_path().to_path_buf();

        std::fs::remove_dir_all(&log_dir).unwrap();

        let result = writer.write_line("INFO lost");
        assert!(matches!(result, Err(Error::Rotation { .. })));
        assert_eq!(writer.current_path(), stale_path.as_path());
    }
}
