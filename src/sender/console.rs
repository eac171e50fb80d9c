use super::{Sender, SenderError};
use crate::pipeline::entry::CanonicalEntry;
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Writes each entry as one JSON line on stdout. Used for dry runs.
#[derive(Debug)]
pub struct ConsoleSender {
    stdout: Mutex<Stdout>,
}

impl ConsoleSender {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for ConsoleSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sender for ConsoleSender {
    async fn send(&self, entry: &CanonicalEntry) -> Result<(), SenderError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        tracing::debug!(
            message_id = %entry.message_id,
            classification = %entry.classification.log_type,
            confidence = entry.classification.confidence,
            "Entry written to stdout"
        );

        let mut stdout = self.stdout.lock().await;
        stdout.write_all(&line).await?;
        stdout.flush().await?;
        Ok(())
    }
}
