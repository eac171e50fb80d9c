use crate::pipeline::entry::Level;
use lazy_static::lazy_static;
use regex::Regex;

const JSON_LEVEL_KEYS: &[&str] = &["level", "severity", "lvl", "loglevel"];

lazy_static! {
    static ref KEY_VALUE: Regex = Regex::new(
        r#"(?i)\b(?:level|lvl|severity|log_level|loglevel)"?\s*[:=]\s*"?(info|warn|warning|error|err|debug|fatal|trace|critical)\b"#
    )
    .expect("failed creating regex");

    static ref PREFIX: Regex = Regex::new(
        r"(?i)^\[?(info|warn|warning|error|err|debug|fatal|trace|critical)\]?(?:[:\s-]|$)"
    )
    .expect("failed creating regex");

    static ref HTTP_STATUS: Regex = Regex::new(r"\s(\d{3})\s").expect("failed creating regex");

    static ref KEYWORD: Regex = Regex::new(
        r"(?i)\b(error|err|fatal|fail|exception|warn|warning|info|debug|trace)\b"
    )
    .expect("failed creating regex");

    /// An HTTP route whose path mentions debug, e.g. `GET /api/debug/ping`
    static ref DEBUG_ROUTE: Regex = Regex::new(
        r"(?i)\b(?:GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\s+/\S*debug\S*"
    )
    .expect("failed creating regex");
}

/// Infer severity. First matching rule wins; falls back to INFO.
pub fn detect_level(message: &str) -> Level {
    let message = message.trim();

    from_json(message)
        .or_else(|| from_key_value(message))
        .or_else(|| from_prefix(message))
        .or_else(|| from_http_status(message))
        .or_else(|| from_keyword(message))
        .unwrap_or_default()
}

fn from_json(message: &str) -> Option<Level> {
    if !message.starts_with('{') {
        return None;
    }
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(message).ok()?;
    JSON_LEVEL_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .map(Level::from_keyword)
}

fn from_key_value(message: &str) -> Option<Level> {
    KEY_VALUE
        .captures(message)
        .map(|caps| Level::from_keyword(&caps[1]))
}

fn from_prefix(message: &str) -> Option<Level> {
    PREFIX
        .captures(message)
        .map(|caps| Level::from_keyword(&caps[1]))
}

fn from_http_status(message: &str) -> Option<Level> {
    let code: u16 = HTTP_STATUS.captures(message)?[1].parse().ok()?;
    match code {
        500..=599 => Some(Level::Error),
        400..=499 => Some(Level::Warn),
        _ => None,
    }
}

fn from_keyword(message: &str) -> Option<Level> {
    let keyword = KEYWORD.captures(message)?.get(1)?.as_str();
    let level = Level::from_keyword(keyword);
    if level == Level::Debug && DEBUG_ROUTE.is_match(message) {
        return Some(Level::Info);
    }
    Some(level)
}
