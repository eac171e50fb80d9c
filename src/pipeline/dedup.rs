use crate::pipeline::stage::{DropReason, LineStage, StageOutcome};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

lazy_static! {
    static ref EMBEDDED_TIMESTAMP: Regex = Regex::new(
        r"(?i)\[?\d{4}[-/]\d{2}[-/]\d{2}[ t]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:z|\s?utc|[+-]\d{2}:?\d{2})?\]?"
    )
    .expect("failed creating regex");

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("failed creating regex");
}

pub type Fingerprint = [u8; 32];

/// Hash of the message as compared for duplicates: lower-cased, trimmed,
/// embedded timestamps removed, whitespace collapsed.
pub fn fingerprint(message: &str) -> Fingerprint {
    let lowered = message.trim().to_lowercase();
    let without_ts = EMBEDDED_TIMESTAMP.replace_all(&lowered, "");
    let normalized = WHITESPACE_RUN.replace_all(without_ts.trim(), " ");
    Sha256::digest(normalized.as_bytes()).into()
}

#[derive(Debug)]
struct DedupState {
    last_seen: HashMap<Fingerprint, Instant>,
    last_sweep: Instant,
}

/// Process-wide, time-windowed duplicate suppression.
///
/// One lock guards the whole cache; suppression is global across sources.
#[derive(Debug)]
pub struct Deduplicator {
    ttl: Duration,
    sweep_interval: Duration,
    state: Mutex<DedupState>,
}

impl Deduplicator {
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_interval(ttl, Duration::ZERO)
    }

    /// `sweep_interval` bounds how often expired entries are purged.
    /// Zero sweeps on every call.
    pub fn with_sweep_interval(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl,
            sweep_interval,
            state: Mutex::new(DedupState {
                last_seen: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `true` the first time a fingerprint is seen or once its TTL has
    /// elapsed, `false` for a repeat inside the window.
    pub fn should_process(&self, message: &str) -> bool {
        self.should_process_at(message, Instant::now())
    }

    pub fn should_process_at(&self, message: &str, now: Instant) -> bool {
        let key = fingerprint(message);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let fresh = match state.last_seen.get(&key) {
            Some(seen) => now.saturating_duration_since(*seen) >= self.ttl,
            None => true,
        };
        state.last_seen.insert(key, now);

        if now.saturating_duration_since(state.last_sweep) >= self.sweep_interval {
            let ttl = self.ttl;
            state
                .last_seen
                .retain(|_, seen| now.saturating_duration_since(*seen) <= ttl);
            state.last_sweep = now;
        }

        fresh
    }

    /// Number of fingerprints currently held
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_seen
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LineStage for Deduplicator {
    fn name(&self) -> &'static str {
        "deduplicator"
    }

    fn apply(&self, line: String) -> StageOutcome {
        if self.should_process(&line) {
            StageOutcome::Continue(line)
        } else {
            StageOutcome::Drop(DropReason::Duplicate)
        }
    }
}
