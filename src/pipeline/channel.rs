use crate::pipeline::orchestrator::Metadata;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type ChunkSender = mpsc::Sender<Chunk>;
pub type ChunkReceiver = mpsc::Receiver<Chunk>;

/// One raw read from a collector, queued for its source key's worker
#[derive(Debug, Clone)]
pub struct Chunk {
    pub raw: String,
    pub metadata: Arc<Metadata>,
}

impl Chunk {
    pub fn new(raw: impl Into<String>, metadata: Arc<Metadata>) -> Self {
        Self {
            raw: raw.into(),
            metadata,
        }
    }
}

/// Create a bounded per-source queue
pub fn create_channel(capacity: usize) -> (ChunkSender, ChunkReceiver) {
    mpsc::channel(capacity.max(1))
}
