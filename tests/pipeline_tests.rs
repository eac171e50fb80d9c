use async_trait::async_trait;
use logship::config::{BackpressureStrategy, PipelineConfig};
use logship::pipeline::{
    BackpressureHandler, CanonicalEntry, Chunk, Level, LogType, Metadata, Pipeline, Router,
};
use logship::sender::{Sender, SenderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CapturingSender {
    entries: Mutex<Vec<CanonicalEntry>>,
}

impl CapturingSender {
    fn entries(&self) -> Vec<CanonicalEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sender for CapturingSender {
    async fn send(&self, entry: &CanonicalEntry) -> Result<(), SenderError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Rejects every other entry
#[derive(Default)]
struct FlakySender {
    calls: AtomicUsize,
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl Sender for FlakySender {
    async fn send(&self, entry: &CanonicalEntry) -> Result<(), SenderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(SenderError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(entry.message.clone());
        Ok(())
    }
}

fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pipeline_with(sender: Arc<dyn Sender>) -> Pipeline {
    Pipeline::new(&PipelineConfig::default(), sender)
}

#[tokio::test]
async fn test_mixed_chunk_end_to_end() {
    let sender = Arc::new(CapturingSender::default());
    let pipeline = pipeline_with(sender.clone());
    let labels = metadata(&[("container_name", "api")]);

    // One timestamp only; two would make the date-time splitter win over
    // newlines
    let raw = "\x1b[32m2024-03-01T10:00:00Z INFO server started\x1b[0m\n\
               ====================\n\
               ERROR request failed for alice@example.com\n\
               Traceback (most recent call last):\n\
               \x20\x20File \"app.py\", line 3, in <module>\n\
               ValueError: invalid literal\n\
               {\"level\":\"warn\",\"msg\":\"slow query\"}";

    pipeline.process(raw, "container:abc", &labels).await;

    let entries = sender.entries();
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "2024-03-01T10:00:00Z INFO server started",
            "ERROR request failed for [REDACTED_EMAIL]",
            "Traceback (most recent call last):\nFile \"app.py\", line 3, in <module>\nValueError: invalid literal",
            "{\"level\":\"warn\",\"msg\":\"slow query\"}",
        ]
    );

    assert_eq!(entries[0].level, Level::Info);
    assert!(!entries[0].timestamp_inferred);
    assert_eq!(entries[1].level, Level::Error);
    assert_eq!(entries[2].level, Level::Error);
    assert!(entries[2].timestamp_inferred);
    assert_eq!(entries[2].classification.log_type, LogType::Exception);
    assert_eq!(entries[3].level, Level::Warn);
    assert_eq!(entries[3].classification.log_type, LogType::Json);

    for entry in &entries {
        assert_eq!(entry.labels["container_name"], "api");
    }

    // Every entry gets its own id
    let mut ids: Vec<_> = entries.iter().map(|e| e.message_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), entries.len());
}

#[tokio::test]
async fn test_python_traceback_is_one_entry() {
    let sender = Arc::new(CapturingSender::default());
    let pipeline = pipeline_with(sender.clone());
    let labels = metadata(&[("source_id", "app")]);

    let raw = "Traceback (most recent call last):\n\
               \x20\x20File \"app.py\", line 3, in <module>\n\
               \x20\x20\x20\x20main()\n\
               \x20\x20File \"app.py\", line 2, in main\n\
               \x20\x20\x20\x20raise ValueError(\"bad\")\n\
               ValueError: bad\n\
               done";

    pipeline.process(raw, "file:app:0", &labels).await;
    pipeline.flush_source("file:app:0", &labels).await;

    let entries = sender.entries();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].level, Level::Error);
    assert_eq!(entries[0].classification.log_type, LogType::Exception);
    assert_eq!(
        entries[0].message,
        "Traceback (most recent call last):\n\
         File \"app.py\", line 3, in <module>\n\
         main()\n\
         File \"app.py\", line 2, in main\n\
         raise ValueError(\"bad\")\n\
         ValueError: bad"
    );
    assert_eq!(entries[1].message, "done");
    assert_eq!(entries[1].level, Level::Info);
}

#[tokio::test]
async fn test_duplicates_suppressed_within_window() {
    let sender = Arc::new(CapturingSender::default());
    let config = PipelineConfig {
        dedup_ttl: Duration::from_millis(200),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(&config, sender.clone());
    let labels = Metadata::new();

    pipeline
        .process("2024-03-01T10:00:00Z cache miss for key users", "a", &labels)
        .await;
    pipeline
        .process("2024-03-01T10:00:05Z Cache miss for key   users", "b", &labels)
        .await;
    assert_eq!(sender.entries().len(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    pipeline
        .process("2024-03-01T10:00:09Z cache miss for key users", "a", &labels)
        .await;
    assert_eq!(sender.entries().len(), 2);
}

#[tokio::test]
async fn test_sender_failure_drops_only_that_entry() {
    let sender = Arc::new(FlakySender::default());
    let pipeline = pipeline_with(sender.clone());
    let labels = Metadata::new();

    pipeline.process("first\nsecond\nthird\nfourth", "k", &labels).await;

    assert_eq!(sender.calls.load(Ordering::SeqCst), 4);
    assert_eq!(*sender.delivered.lock().unwrap(), vec!["second", "fourth"]);
}

#[tokio::test]
async fn test_stream_closed_mid_stack_trace_is_flushed() {
    let sender = Arc::new(CapturingSender::default());
    let pipeline = pipeline_with(sender.clone());
    let labels = metadata(&[("pod_name", "worker-1")]);

    pipeline
        .process(
            "java.lang.IllegalStateException: closed\n\tat com.example.Worker.run(Worker.java:42)",
            "pod:worker-1",
            &labels,
        )
        .await;
    assert!(sender.entries().is_empty());

    pipeline.flush_source("pod:worker-1", &labels).await;

    let entries = sender.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, Level::Error);
    assert_eq!(
        entries[0].message,
        "java.lang.IllegalStateException: closed\nat com.example.Worker.run(Worker.java:42)"
    );
    assert_eq!(entries[0].labels["pod_name"], "worker-1");
}

#[tokio::test]
async fn test_router_keeps_sources_apart() {
    let sender = Arc::new(CapturingSender::default());
    let pipeline = Arc::new(pipeline_with(sender.clone()));
    let router = Arc::new(Router::new(
        pipeline,
        BackpressureHandler::new(BackpressureStrategy::Block, 4),
    ));

    let tasks: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|name| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let labels = Arc::new(metadata(&[("source", name)]));
                let key = format!("svc:{}", name);
                let lines = [
                    format!("{}Error: {} failed", name.to_uppercase(), name),
                    format!("    at {}.handler (index.js:10:5)", name),
                    format!("    at {}.main (index.js:20:1)", name),
                    format!("{} recovered", name),
                ];
                for line in lines {
                    router
                        .dispatch(&key, Chunk::new(line, Arc::clone(&labels)))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    router.shutdown().await;

    let entries = sender.entries();
    assert_eq!(entries.len(), 6);

    for name in ["alpha", "beta", "gamma"] {
        let own: Vec<&CanonicalEntry> = entries
            .iter()
            .filter(|e| e.labels["source"] == name)
            .collect();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].level, Level::Error);
        assert_eq!(own[0].message.lines().count(), 3);
        assert!(own[0].message.lines().all(|l| l.contains(name)));
        assert_eq!(own[1].message, format!("{} recovered", name));
    }
}
