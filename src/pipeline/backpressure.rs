use crate::config::types::BackpressureStrategy;
use crate::pipeline::channel::{Chunk, ChunkSender};
use tokio::sync::mpsc::error::TrySendError;

/// What happened to a chunk handed to a source queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued,
    /// The queue was full and the strategy is `drop`
    Dropped,
    /// The worker for this key has gone away
    Closed,
}

/// Applies the configured queue-full policy when enqueueing chunks.
#[derive(Debug, Clone, Copy)]
pub struct BackpressureHandler {
    strategy: BackpressureStrategy,
    capacity: usize,
}

impl BackpressureHandler {
    pub fn new(strategy: BackpressureStrategy, capacity: usize) -> Self {
        Self { strategy, capacity }
    }

    /// Bound for each source queue
    pub fn channel_buffer_size(&self) -> usize {
        self.capacity.max(1)
    }

    pub fn strategy(&self) -> BackpressureStrategy {
        self.strategy
    }

    pub async fn admit(&self, queue: &ChunkSender, chunk: Chunk) -> Admission {
        match self.strategy {
            BackpressureStrategy::Block => match queue.send(chunk).await {
                Ok(()) => Admission::Queued,
                Err(_) => Admission::Closed,
            },
            BackpressureStrategy::Drop => match queue.try_send(chunk) {
                Ok(()) => Admission::Queued,
                Err(TrySendError::Full(_)) => Admission::Dropped,
                Err(TrySendError::Closed(_)) => Admission::Closed,
            },
        }
    }
}
