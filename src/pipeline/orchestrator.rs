use crate::config::types::PipelineConfig;
use crate::grouper::GrouperTable;
use crate::pipeline::classifier::classify;
use crate::pipeline::cleaner::Cleaner;
use crate::pipeline::dedup::Deduplicator;
use crate::pipeline::entry::{CanonicalEntry, GroupedLine};
use crate::pipeline::level::detect_level;
use crate::pipeline::redactor::Redactor;
use crate::pipeline::splitter::split;
use crate::pipeline::stage::{run_stages, LineStage, StageOutcome};
use crate::pipeline::timestamp::extract_timestamp;
use crate::sender::Sender;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

pub type Metadata = HashMap<String, String>;

/// Turns raw chunks into canonical entries and hands them to a sender.
///
/// Stages are built once and shared by every source. Grouping state is kept
/// per source key; a key's chunks must reach [`Pipeline::process`] in order
/// and never concurrently (use [`crate::pipeline::Router`] to get that for
/// free). Different keys may be processed in parallel.
pub struct Pipeline {
    stages: Vec<Box<dyn LineStage>>,
    groupers: GrouperTable,
    sender: Arc<dyn Sender>,
    static_labels: Metadata,
}

impl Pipeline {
    /// Cleaner, redactor and deduplicator, in that order
    pub fn new(config: &PipelineConfig, sender: Arc<dyn Sender>) -> Self {
        let stages: Vec<Box<dyn LineStage>> = vec![
            Box::new(Cleaner),
            Box::new(Redactor),
            Box::new(Deduplicator::with_sweep_interval(
                config.dedup_ttl,
                config.dedup_sweep_interval,
            )),
        ];
        Self::with_stages(stages, sender)
    }

    pub fn with_stages(stages: Vec<Box<dyn LineStage>>, sender: Arc<dyn Sender>) -> Self {
        Self {
            stages,
            groupers: GrouperTable::new(),
            sender,
            static_labels: Metadata::new(),
        }
    }

    /// Labels merged into every entry. Caller metadata wins on conflict.
    pub fn with_labels(mut self, labels: Metadata) -> Self {
        self.static_labels = labels;
        self
    }

    /// Source keys currently holding grouper state
    pub fn active_sources(&self) -> Vec<String> {
        self.groupers.keys()
    }

    /// Run one raw chunk from `source_key` through every stage. Each
    /// completed record is sent before this returns; send failures are
    /// logged and the record is dropped.
    pub async fn process(&self, raw: &str, source_key: &str, metadata: &Metadata) {
        for line in split(raw) {
            let line = match run_stages(&self.stages, line) {
                StageOutcome::Continue(line) => line,
                StageOutcome::Drop(reason) => {
                    debug!(source_key, %reason, "Line dropped");
                    continue;
                }
            };

            for grouped in self.group(source_key, &line) {
                self.deliver(grouped, metadata).await;
            }
        }
    }

    /// Emit whatever exception `source_key` still buffers and forget the key.
    /// Call this when the underlying stream ends.
    pub async fn flush_source(&self, source_key: &str, metadata: &Metadata) {
        let Some(grouper) = self.groupers.remove(source_key) else {
            return;
        };

        let flushed = {
            let mut grouper = grouper.lock().unwrap_or_else(|e| e.into_inner());
            grouper.flush()
        };

        if let Some(grouped) = flushed {
            debug!(source_key, "Flushed buffered exception");
            self.deliver(grouped, metadata).await;
        }
    }

    // Synchronous so the grouper lock is never held across an await
    fn group(&self, source_key: &str, line: &str) -> Vec<GroupedLine> {
        let grouper = self.groupers.get_or_create(source_key);
        let mut grouper = grouper.lock().unwrap_or_else(|e| e.into_inner());
        grouper.process_line(line)
    }

    fn build_entry(&self, grouped: GroupedLine, metadata: &Metadata) -> CanonicalEntry {
        let level = grouped
            .level
            .unwrap_or_else(|| detect_level(&grouped.message));
        let (timestamp, timestamp_inferred) = extract_timestamp(&grouped.message);
        let classification = classify(&grouped.message);

        let mut labels = self.static_labels.clone();
        labels.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));

        CanonicalEntry {
            message: grouped.message,
            timestamp,
            level,
            message_id: Uuid::new_v4(),
            labels,
            timestamp_inferred,
            classification,
        }
    }

    async fn deliver(&self, grouped: GroupedLine, metadata: &Metadata) {
        let entry = self.build_entry(grouped, metadata);
        if let Err(e) = self.sender.send(&entry).await {
            error!(
                error = %e,
                message_id = %entry.message_id,
                level = %entry.level,
                message = %entry.message,
                "Failed to send entry, dropping it"
            );
        }
    }
}
