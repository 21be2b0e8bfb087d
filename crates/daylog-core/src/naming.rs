//! Log file naming: `<year>-<month>-<day>_<seq>.log`
//!
//! The date stamp is deliberately unpadded (`2025-1-5`, never `2025-01-05`).
//! Existing deployments have files named this way, and both file selection
//! and rotation depend on matching it exactly.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Suffix shared by every log file
pub const LOG_SUFFIX: &str = ".log";

/// Unpadded `<year>-<month>-<day>` stamp for a calendar date
pub fn date_stamp(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Parsed identity of a log file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileName {
    /// Unpadded date stamp
    pub stamp: String,
    /// Positive sequence number within the day
    pub sequence: u32,
}

impl LogFileName {
    pub fn new(stamp: impl Into<String>, sequence: u32) -> Self {
        Self {
            stamp: stamp.into(),
            sequence,
        }
    }

    /// First file of the day for `date`
    pub fn first_of(date: NaiveDate) -> Self {
        Self::new(date_stamp(date), 1)
    }

    /// Parse a file name such as `2025-1-5_3.log`.
    ///
    /// Returns `None` for anything that is not a log file or whose sequence
    /// is not a positive integer.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(LOG_SUFFIX)?;
        let (stamp, sequence) = stem.rsplit_once('_')?;
        let sequence: u32 = sequence.parse().ok()?;

        if stamp.is_empty() || sequence == 0 {
            return None;
        }

        Some(Self::new(stamp, sequence))
    }

    /// Name of the next file in the same day
    pub fn next(&self) -> Option<Self> {
        let sequence = self.sequence.checked_add(1)?;
        Some(Self::new(self.stamp.clone(), sequence))
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.stamp == date_stamp(date)
    }
}

impl fmt::Display for LogFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}{}", self.stamp, self.sequence, LOG_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_stamp_is_unpadded() {
        assert_eq!(date_stamp(date(2025, 1, 5)), "2025-1-5");
        assert_eq!(date_stamp(date(2025, 11, 10)), "2025-11-10");
        assert_eq!(date_stamp(date(2024, 2, 29)), "2024-2-29");
    }

    #[test]
    fn test_file_name_display() {
        assert_eq!(LogFileName::first_of(date(2025, 3, 7)).to_string(), "2025-3-7_1.log");
        assert_eq!(LogFileName::new("2025-3-7", 12).to_string(), "2025-3-7_12.log");
    }

    #[test]
    fn test_parse_valid_names() {
        assert_eq!(
            LogFileName::parse("2025-1-5_3.log"),
            Some(LogFileName::new("2025-1-5", 3))
        );
        assert_eq!(
            LogFileName::parse("2025-10-31_140.log"),
            Some(LogFileName::new("2025-10-31", 140))
        );
    }

    #[test]
    fn test_parse_rejects_other_files() {
        assert_eq!(LogFileName::parse("data.txt"), None);
        assert_eq!(LogFileName::parse("2025-1-5.log"), None);
        assert_eq!(LogFileName::parse("2025-1-5_x.log"), None);
        assert_eq!(LogFileName::parse("2025-1-5_0.log"), None);
        assert_eq!(LogFileName::parse("2025-1-5_-2.log"), None);
        assert_eq!(LogFileName::parse("_4.log"), None);
        assert_eq!(LogFileName::parse("2025-1-5_3.log.gz"), None);
    }

    #[test]
    fn test_next_and_date_match() {
        let name = LogFileName::new("2025-1-1", 2);
        assert_eq!(name.next(), Some(LogFileName::new("2025-1-1", 3)));
        assert_eq!(LogFileName::new("2025-1-1", u32::MAX).next(), None);
        assert!(name.is_for(date(2025, 1, 1)));
        assert!(!name.is_for(date(2025, 1, 10)));
        assert!(!LogFileName::new("2025-1-10", 1).is_for(date(2025, 1, 1)));
    }
}
