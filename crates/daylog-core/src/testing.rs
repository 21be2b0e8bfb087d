//! In-memory logger for tests of code that depends on [`Logger`]

use crate::{
    config::{LogFormat, LogLevel},
    formatters::{Fields, LineFormatter, LogEvent},
    logger::Logger,
    Result,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Records every line instead of touching the filesystem.
///
/// Lines are rendered in text format. No level filtering is applied.
/// `fatal` records the line and then panics, since a test double cannot
/// terminate the test process.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    state: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<String>,
    calls: HashMap<LogLevel, usize>,
    closed: bool,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines in call order
    pub fn messages(&self) -> Vec<String> {
        self.state().messages.clone()
    }

    /// Number of calls made at `level`
    pub fn calls(&self, level: LogLevel) -> usize {
        self.state().calls.get(&level).copied().unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn record(&self, level: LogLevel, message: &str, fields: Fields) -> String {
        let fields = if fields.is_empty() { None } else { Some(fields) };
        let line = LineFormatter::new(LogFormat::Text).format(&LogEvent::new(level, message, fields));

        let mut state = self.state();
        state.messages.push(line.clone());
        *state.calls.entry(level).or_insert(0) += 1;

        line
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Logger for RecordingLogger {
    fn debug_with(&self, message: &str, fields: Fields) {
        self.record(LogLevel::Debug, message, fields);
    }

    fn info_with(&self, message: &str, fields: Fields) {
        self.record(LogLevel::Info, message, fields);
    }

    fn warn_with(&self, message: &str, fields: Fields) {
        self.record(LogLevel::Warn, message, fields);
    }

    fn error_with(&self, message: &str, fields: Fields) {
        self.record(LogLevel::Error, message, fields);
    }

    fn fatal_with(&self, message: &str, fields: Fields) -> ! {
        let line = self.record(LogLevel::Fatal, message, fields);
        panic!("fatal log: {}", line)
    }

    fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
