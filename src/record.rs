use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Service identity stamped on every record unless configured otherwise.
pub const DEFAULT_SERVICE_NAME: &str = "nodejs-app";

/// Timestamp layout shared by both output formats: local time, millisecond
/// precision and a numeric zone offset, e.g. `2024-05-01T12:30:45.123+0200`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Field key whose value the text format renders as a trailing block.
pub const STACKTRACE_FIELD: &str = "stacktrace";

/// Severity of a record, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }

    /// Whether a record at `self` passes a pipeline whose threshold is
    /// `threshold`.
    pub fn passes(&self, threshold: Level) -> bool {
        *self <= threshold
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Auxiliary record data keyed by name. A `BTreeMap` keeps serialized
/// output ordering stable.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// One log event as supplied by a call site, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: Fields,
}

impl LogRecord {
    /// Build a record from a message and auxiliary fields.
    ///
    /// # Panics
    ///
    /// Panics if `message` is empty: a record without a message is a bug at
    /// the call site, not something to write out half-formed.
    pub fn new(level: Level, message: impl Into<String>, fields: Fields) -> Self {
        let message = message.into();
        assert!(!message.is_empty(), "log record message must not be empty");
        Self { level, message, fields }
    }

    /// Build a record from an object payload whose `message` entry carries
    /// the message. The remaining entries become fields.
    ///
    /// # Panics
    ///
    /// Panics if `message` is missing, not a string, or empty.
    pub fn from_fields(level: Level, mut fields: Fields) -> Self {
        let message = match fields.remove("message") {
            Some(serde_json::Value::String(message)) => message,
            other => panic!("log record payload needs a string `message`, got {:?}", other),
        };
        Self::new(level, message, fields)
    }
}

/// A [`LogRecord`] stamped with the time it was enriched and the emitting
/// service.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub service: Arc<str>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
}

impl EnrichedRecord {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// The stacktrace field rendered as text, if present and non-empty.
    pub fn stacktrace(&self) -> Option<String> {
        match self.fields.get(STACKTRACE_FIELD)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Attaches a timestamp and the process service name to raw records.
#[derive(Debug, Clone)]
pub struct Enricher {
    service: Arc<str>,
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl Enricher {
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self { service: service.into() }
    }

    /// Stamp `record` with the current local time.
    pub fn enrich(&self, record: LogRecord) -> EnrichedRecord {
        self.enrich_at(record, Local::now().fixed_offset())
    }

    pub fn enrich_at(&self, record: LogRecord, timestamp: DateTime<FixedOffset>) -> EnrichedRecord {
        EnrichedRecord {
            timestamp,
            service: Arc::clone(&self.service),
            level: record.level,
            message: record.message,
            fields: record.fields,
        }
    }
}
