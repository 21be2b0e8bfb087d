//! Line formatters for log events

use crate::config::{LogFormat, LogLevel};
use chrono::{DateTime, Local, SecondsFormat};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Structured fields attached to an event. Values are expected to be
/// scalars or null.
pub type Fields = HashMap<String, Value>;

/// A single log event. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct LogEvent {
    level: LogLevel,
    message: String,
    fields: Option<Fields>,
    timestamp: DateTime<Local>,
}

impl LogEvent {
    /// Create an event stamped with the current local time
    pub fn new(level: LogLevel, message: impl Into<String>, fields: Option<Fields>) -> Self {
        Self::at(level, message, fields, Local::now())
    }

    pub fn at(
        level: LogLevel,
        message: impl Into<String>,
        fields: Option<Fields>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            fields,
            timestamp,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Renders events as single output lines (without the trailing newline)
#[derive(Debug, Clone, Copy)]
pub struct LineFormatter {
    format: LogFormat,
}

impl LineFormatter {
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, event: &LogEvent) -> String {
        match self.format {
            LogFormat::Json => Self::format_json(event),
            LogFormat::Text => Self::format_text(event),
        }
    }

    /// `level`, `message` and `time`, then every field merged in. Fields
    /// win over the reserved keys.
    fn format_json(event: &LogEvent) -> String {
        let mut entry = Map::new();
        entry.insert("level".to_string(), json!(event.level().label()));
        entry.insert("message".to_string(), json!(event.message()));
        entry.insert(
            "time".to_string(),
            json!(event.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        if let Some(fields) = event.fields() {
            for (key, value) in fields {
                entry.insert(key.clone(), value.clone());
            }
        }

        match serde_json::to_string(&Value::Object(entry)) {
            Ok(line) => line,
            Err(e) => format!(
                "{} {} fields_error={}",
                event.level().label(),
                event.message(),
                e
            ),
        }
    }

    fn format_text(event: &LogEvent) -> String {
        let mut line = format!("{} {}", event.level().label(), event.message());

        if let Some(fields) = event.fields() {
            for (key, value) in fields {
                line.push(' ');
                line.push_str(key);
                line.push('=');
                line.push_str(&render_value(value));
            }
        }

        line
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
