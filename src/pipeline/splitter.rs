use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `IP - - [timestamp]` at the start of a combined/common access log record
    static ref ACCESS_LOG_MARKER: Regex =
        Regex::new(r"\d+\.\d+\.\d+\.\d+\s+-\s+-\s+\[[^\]]+\]").expect("failed creating regex");

    static ref JSON_BOUNDARY: Regex = Regex::new(r"\}\s*\{").expect("failed creating regex");

    static ref HTTP_REQUEST_MARKER: Regex =
        Regex::new(r#""(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+[^"]+""#)
            .expect("failed creating regex");

    static ref DATE_TIME_MARKER: Regex =
        Regex::new(r"\d{4}[-/]\d{2}[-/]\d{2}[ T]\d{2}:\d{2}:\d{2}").expect("failed creating regex");
}

type SplitStrategy = fn(&str) -> Vec<String>;

/// Tried in order; the first strategy producing more than one segment wins.
const STRATEGIES: &[(&str, SplitStrategy)] = &[
    ("access_log", split_by_access_log),
    ("json_objects", split_by_json_objects),
    ("http_request", split_by_http_request),
    ("date_time", split_by_date_time),
    ("newline", split_by_newline),
];

/// Segment a raw chunk into candidate log lines.
///
/// Never returns an empty vector: when no strategy finds more than one
/// record, the whole trimmed input comes back as a single segment.
pub fn split(raw: &str) -> Vec<String> {
    for (name, strategy) in STRATEGIES {
        let segments = strategy(raw);
        if segments.len() > 1 {
            tracing::trace!(strategy = name, segments = segments.len(), "Split raw chunk");
            return segments;
        }
    }
    vec![raw.trim().to_string()]
}

fn split_by_access_log(raw: &str) -> Vec<String> {
    split_at_markers(raw, &ACCESS_LOG_MARKER)
}

fn split_by_http_request(raw: &str) -> Vec<String> {
    split_at_markers(raw, &HTTP_REQUEST_MARKER)
}

fn split_by_date_time(raw: &str) -> Vec<String> {
    split_at_markers(raw, &DATE_TIME_MARKER)
}

/// Split between adjacent objects; the closing brace stays with the
/// preceding object and the opening brace with the next one.
fn split_by_json_objects(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;

    for boundary in JSON_BOUNDARY.find_iter(raw) {
        push_trimmed(&mut segments, &raw[start..boundary.start() + 1]);
        start = boundary.end() - 1;
    }

    if start == 0 {
        return Vec::new();
    }
    push_trimmed(&mut segments, &raw[start..]);
    segments
}

fn split_by_newline(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    for line in raw.lines() {
        push_trimmed(&mut segments, line);
    }
    segments
}

/// Cut `raw` at the start of every marker match. Text ahead of the first
/// marker is kept as its own segment so no content is lost.
fn split_at_markers(raw: &str, marker: &Regex) -> Vec<String> {
    let starts: Vec<usize> = marker.find_iter(raw).map(|m| m.start()).collect();
    if starts.len() < 2 {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity(starts.len() + 1);
    push_trimmed(&mut segments, &raw[..starts[0]]);
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(raw.len());
        push_trimmed(&mut segments, &raw[start..end]);
    }
    segments
}

fn push_trimmed(segments: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}
