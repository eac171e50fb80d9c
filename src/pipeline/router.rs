use crate::pipeline::backpressure::{Admission, BackpressureHandler};
use crate::pipeline::channel::{create_channel, Chunk, ChunkReceiver, ChunkSender};
use crate::pipeline::orchestrator::{Metadata, Pipeline};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct Route {
    queue: ChunkSender,
    worker: JoinHandle<()>,
}

/// Gives every source key its own bounded queue and a single worker task.
///
/// The worker is the only caller of [`Pipeline::process`] for its key, so a
/// key's chunks are processed in arrival order without overlap no matter how
/// many collector tasks dispatch to it. When the queue closes, the worker
/// flushes the key's grouper before exiting.
pub struct Router {
    pipeline: Arc<Pipeline>,
    backpressure: BackpressureHandler,
    routes: Mutex<HashMap<String, Route>>,
}

impl Router {
    pub fn new(pipeline: Arc<Pipeline>, backpressure: BackpressureHandler) -> Self {
        Self {
            pipeline,
            backpressure,
            routes: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a chunk for `source_key`, starting its worker on first use
    pub async fn dispatch(&self, source_key: &str, chunk: Chunk) -> Admission {
        let queue = self.queue_for(source_key);
        let admission = self.backpressure.admit(&queue, chunk).await;

        match admission {
            Admission::Queued => {}
            Admission::Dropped => {
                warn!(source_key, "Source queue full, dropping chunk");
            }
            Admission::Closed => {
                error!(source_key, "Source worker stopped, dropping chunk");
            }
        }
        admission
    }

    fn queue_for(&self, source_key: &str) -> ChunkSender {
        let mut routes = self.lock();
        if let Some(route) = routes.get(source_key) {
            return route.queue.clone();
        }

        let (queue, rx) = create_channel(self.backpressure.channel_buffer_size());
        let worker = tokio::spawn(run_worker(
            Arc::clone(&self.pipeline),
            source_key.to_string(),
            rx,
        ));
        debug!(source_key, "Started source worker");

        routes.insert(
            source_key.to_string(),
            Route {
                queue: queue.clone(),
                worker,
            },
        );
        queue
    }

    /// Close the key's queue and wait until everything queued for it, plus
    /// any buffered exception, has been sent
    pub async fn close(&self, source_key: &str) {
        let route = self.lock().remove(source_key);
        if let Some(route) = route {
            finish(source_key, route).await;
        }
    }

    /// Close every queue and wait for all workers to drain and flush
    pub async fn shutdown(&self) {
        let routes: Vec<(String, Route)> = self.lock().drain().collect();
        info!(sources = routes.len(), "Flushing source workers");

        let pending = routes
            .into_iter()
            .map(|(key, route)| async move { finish(&key, route).await });
        futures::future::join_all(pending).await;
    }

    pub fn active_routes(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

async fn finish(source_key: &str, route: Route) {
    let Route { queue, worker } = route;
    drop(queue);
    if let Err(e) = worker.await {
        error!(source_key, error = %e, "Source worker failed");
    }
}

async fn run_worker(pipeline: Arc<Pipeline>, source_key: String, mut rx: ChunkReceiver) {
    let mut last_metadata: Arc<Metadata> = Arc::default();

    while let Some(chunk) = rx.recv().await {
        pipeline
            .process(&chunk.raw, &source_key, &chunk.metadata)
            .await;
        last_metadata = chunk.metadata;
    }

    pipeline.flush_source(&source_key, &last_metadata).await;
    debug!(source_key = %source_key, "Source worker finished");
}
