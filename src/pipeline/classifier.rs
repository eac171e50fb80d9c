use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref ACCESS_LOG: Regex = Regex::new(
        r#"\d+\.\d+\.\d+\.\d+\s+-\s+\S+\s+\[.+\]\s+"(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+.+?"\s+\d{3}"#
    )
    .expect("failed creating regex");
}

const EXCEPTION_KEYWORDS: &[&str] = &["Exception", "Traceback", "Error", "Caused by", "panic:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    #[default]
    Plain,
    Json,
    AccessLog,
    Exception,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogType::Plain => "PLAIN",
            LogType::Json => "JSON",
            LogType::AccessLog => "ACCESS_LOG",
            LogType::Exception => "EXCEPTION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub log_type: LogType,
    /// 0-100
    pub confidence: u8,
    pub evidence: Vec<String>,
}

impl Classification {
    fn new(log_type: LogType, confidence: u8, evidence: &str) -> Self {
        Self {
            log_type,
            confidence,
            evidence: vec![evidence.to_string()],
        }
    }
}

/// Classify a message by shape. The first matching rule wins.
pub fn classify(message: &str) -> Classification {
    let trimmed = message.trim();

    if trimmed.starts_with('{')
        && serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(trimmed).is_ok()
    {
        return Classification::new(LogType::Json, 95, "valid JSON");
    }

    if ACCESS_LOG.is_match(trimmed) {
        return Classification::new(LogType::AccessLog, 85, "access log pattern");
    }

    let keywords: Vec<String> = EXCEPTION_KEYWORDS
        .iter()
        .filter(|kw| trimmed.contains(*kw))
        .map(|kw| format!("keyword '{}'", kw))
        .collect();
    if !keywords.is_empty() {
        return Classification {
            log_type: LogType::Exception,
            confidence: 90,
            evidence: keywords,
        };
    }

    Classification::new(LogType::Plain, 60, "no strong pattern")
}
