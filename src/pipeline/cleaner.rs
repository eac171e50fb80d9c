use crate::pipeline::stage::{DropReason, LineStage, StageOutcome};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ANSI_ESCAPE: Regex =
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)")
            .expect("failed creating regex");

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("failed creating regex");

    /// One leading timestamp, optionally bracketed, plus trailing separators
    static ref TIMESTAMP_PREFIX: Regex = Regex::new(
        r"^\[?\d{4}[-/]\d{2}[-/]\d{2}(?:T|\s+)\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|\s*UTC|[+-]\d{2}:?\d{2})?\]?[-\s:]*"
    )
    .expect("failed creating regex");

    static ref SEPARATOR_ONLY: Regex =
        Regex::new(r"^[-=*_.~\\/\s]+$").expect("failed creating regex");
}

/// Strip terminal noise from one line.
///
/// Idempotent. May return an empty string, which callers must drop.
pub fn clean(line: &str) -> String {
    let without_ansi = ANSI_ESCAPE.replace_all(line, "");
    let printable: String = without_ansi
        .chars()
        .filter_map(|c| match c {
            '\t' | '\n' | '\r' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&printable, " ");
    collapse_repeated_timestamps(collapsed.trim()).trim().to_string()
}

/// `[ts] [ts] msg` becomes `[ts] msg`: every leading timestamp except the
/// last one is removed so the event time survives for later extraction.
fn collapse_repeated_timestamps(mut s: &str) -> &str {
    while let Some(prefix) = TIMESTAMP_PREFIX.find(s) {
        let rest = &s[prefix.end()..];
        if !TIMESTAMP_PREFIX.is_match(rest) {
            break;
        }
        s = rest;
    }
    s
}

/// Lines made only of decoration characters carry no content
pub fn is_separator_line(line: &str) -> bool {
    SEPARATOR_ONLY.is_match(line)
}

#[derive(Debug, Default)]
pub struct Cleaner;

impl LineStage for Cleaner {
    fn name(&self) -> &'static str {
        "cleaner"
    }

    fn apply(&self, line: String) -> StageOutcome {
        let cleaned = clean(&line);
        if cleaned.is_empty() || is_separator_line(&cleaned) {
            return StageOutcome::Drop(DropReason::Empty);
        }
        StageOutcome::Continue(cleaned)
    }
}
