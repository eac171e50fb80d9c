use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Every alternative here must be parseable by at least one entry of
    /// `LAYOUTS`. Keep the two in step.
    static ref CANDIDATE: Regex = Regex::new(concat!(
        // ISO-8601 / log4j, optional fraction and zone
        r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d{1,9})?(?:Z| ?[+-]\d{2}:?\d{2}| UTC)?",
        // access log: 02/Jan/2006:15:04:05 -0700
        r"|\d{2}/[A-Z][a-z]{2}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}",
        // RFC 2822: Mon, 02 Jan 2006 15:04:05 -0700
        r"|[A-Z][a-z]{2}, \d{1,2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2} (?:[+-]\d{4}|GMT|UTC)",
        // 2006/01/02 15:04:05
        r"|\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}",
        // 01/02/2006 15:04:05
        r"|\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}",
        // syslog: Jan  2 15:04:05
        r"|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) +\d{1,2} \d{2}:\d{2}:\d{2}",
    ))
    .expect("failed creating regex");

    static ref DEFAULT_EXTRACTOR: TimestampExtractor = TimestampExtractor::default();
}

#[derive(Debug, Clone, Copy)]
pub enum TimestampFormat {
    Rfc3339,
    Rfc2822,
    /// strptime layout carrying an offset
    Zoned(&'static str),
    /// strptime layout without zone, read as UTC
    Naive(&'static str),
    /// syslog layout without a year; the current year is assumed
    Yearless(&'static str),
}

const LAYOUTS: &[TimestampFormat] = &[
    TimestampFormat::Rfc3339,
    TimestampFormat::Zoned("%Y-%m-%dT%H:%M:%S%.f%z"),
    TimestampFormat::Zoned("%Y-%m-%d %H:%M:%S%.f%z"),
    TimestampFormat::Zoned("%Y-%m-%dT%H:%M:%S%.f %z"),
    TimestampFormat::Zoned("%Y-%m-%d %H:%M:%S%.f %z"),
    TimestampFormat::Naive("%Y-%m-%dT%H:%M:%S%.f"),
    TimestampFormat::Naive("%Y-%m-%d %H:%M:%S%.f"),
    TimestampFormat::Zoned("%d/%b/%Y:%H:%M:%S %z"),
    TimestampFormat::Rfc2822,
    TimestampFormat::Naive("%Y/%m/%d %H:%M:%S"),
    TimestampFormat::Naive("%m/%d/%Y %H:%M:%S"),
    TimestampFormat::Yearless("%Y %b %d %H:%M:%S"),
];

/// Finds an event time inside a message.
#[derive(Debug)]
pub struct TimestampExtractor {
    pattern: &'static Regex,
    layouts: &'static [TimestampFormat],
}

impl Default for TimestampExtractor {
    fn default() -> Self {
        Self {
            pattern: &CANDIDATE,
            layouts: LAYOUTS,
        }
    }
}

impl TimestampExtractor {
    /// Returns the parsed instant and `false`, or `now` and `true` when no
    /// candidate is found or none of the layouts accepts it.
    pub fn extract_at(&self, message: &str, now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        match self.parse_candidate(message, now) {
            Some(ts) => (ts, false),
            None => (now, true),
        }
    }

    fn parse_candidate(&self, message: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let candidate = self.pattern.find(message)?.as_str();
        let normalized = normalize(candidate);

        self.layouts
            .iter()
            .find_map(|layout| parse_with(layout, &normalized, now))
    }
}

/// Comma fractions become dots, repeated spaces collapse and literal UTC
/// suffixes become a numeric offset.
fn normalize(candidate: &str) -> String {
    let mut s = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        s = s.replacen(',', ".", 1);
        if let Some(stripped) = s.strip_suffix(" UTC").or_else(|| s.strip_suffix('Z')) {
            s = format!("{}+0000", stripped);
        }
    }
    s
}

fn parse_with(layout: &TimestampFormat, value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match layout {
        TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        TimestampFormat::Rfc2822 => DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        TimestampFormat::Zoned(fmt) => DateTime::parse_from_str(value, fmt)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        TimestampFormat::Naive(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|ndt| Utc.from_utc_datetime(&ndt)),
        TimestampFormat::Yearless(fmt) => {
            NaiveDateTime::parse_from_str(&format!("{} {}", now.year(), value), fmt)
                .ok()
                .map(|ndt| Utc.from_utc_datetime(&ndt))
        }
    }
}

/// Extract an event time using the built-in layouts, falling back to the
/// current time with `inferred = true`.
pub fn extract_timestamp(message: &str) -> (DateTime<Utc>, bool) {
    DEFAULT_EXTRACTOR.extract_at(message, Utc::now())
}
