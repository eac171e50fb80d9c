use crate::pipeline::classifier::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Severity assigned to every forwarded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    /// Normalize a free-form level keyword. Unknown keywords map to INFO.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "fail" | "failed" | "exception" | "critical" | "crit"
            | "panic" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "debug" | "trace" => Level::Debug,
            "info" | "started" | "running" | "notice" => Level::Info,
            _ => Level::Info,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical record emitted by an exception grouper.
///
/// `level` is only set when the grouper already knows the severity
/// (flushed stack traces are always errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedLine {
    pub message: String,
    pub level: Option<Level>,
}

impl GroupedLine {
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some(Level::Error),
        }
    }
}

/// The fully normalized record handed to a sender
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message_id: Uuid,
    pub labels: HashMap<String, String>,
    pub timestamp_inferred: bool,
    #[serde(skip)]
    pub classification: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classifier::classify;

    #[test]
    fn test_level_from_keyword() {
        assert_eq!(Level::from_keyword("error"), Level::Error);
        assert_eq!(Level::from_keyword("FATAL"), Level::Error);
        assert_eq!(Level::from_keyword("exception"), Level::Error);
        assert_eq!(Level::from_keyword("Warning"), Level::Warn);
        assert_eq!(Level::from_keyword("trace"), Level::Debug);
        assert_eq!(Level::from_keyword("running"), Level::Info);
        assert_eq!(Level::from_keyword("verbose"), Level::Info);
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = CanonicalEntry {
            message: "hello".to_string(),
            timestamp: "2024-01-02T03:04:05Z".parse().unwrap(),
            level: Level::Warn,
            message_id: Uuid::new_v4(),
            labels: HashMap::from([("pod_name".to_string(), "api-0".to_string())]),
            timestamp_inferred: false,
            classification: classify("hello"),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["message"], "hello");
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["timestamp"], "2024-01-02T03:04:05Z");
        assert_eq!(json["labels"]["pod_name"], "api-0");
        assert_eq!(json["timestamp_inferred"], false);
        assert!(json["message_id"].is_string());
        assert!(json.get("classification").is_none());
    }
}
