pub mod file;
pub mod journald;

use crate::pipeline::orchestrator::Metadata;
use crate::pipeline::{Admission, Chunk, Router};
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use file::{run_file_source, FileTail, TailEvent};
pub use journald::{parse_journal_line, run_journald_source, JournalEntry};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode journal entry: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("journal stream ended: {0}")]
    Exited(String),
}

/// Identity of one logical log stream.
///
/// A new physical stream (a rotated file, a restarted unit) must get a new
/// key; grouping state is never shared across keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn file(source_id: &str, generation: u64) -> Self {
        Self(format!("file:{}:{}", source_id, generation))
    }

    pub fn journald(identifier: &str) -> Self {
        Self(format!("journald:{}", identifier))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Labels describing the machine the agent runs on
pub fn host_metadata() -> Metadata {
    let host_name = hostname::get()
        .ok()
        .and_then(|h| h.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let machine_ip = local_ipv4()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Metadata::from([
        ("host_name".to_string(), host_name),
        ("machine_ip".to_string(), machine_ip),
        ("os".to_string(), std::env::consts::OS.to_string()),
        ("architecture".to_string(), std::env::consts::ARCH.to_string()),
    ])
}

/// Address of the interface holding the default route. Connecting a UDP
/// socket sends nothing; it only selects the outbound interface.
fn local_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

/// What every collector task shares: where chunks go, the host labels, the
/// ignore list and the shutdown signal.
pub struct SourceContext {
    router: Arc<Router>,
    host: Metadata,
    ignored: HashSet<String>,
    shutdown: CancellationToken,
}

impl SourceContext {
    pub fn new(
        router: Arc<Router>,
        host: Metadata,
        ignored: impl IntoIterator<Item = String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            router,
            host,
            ignored: ignored.into_iter().collect(),
            shutdown,
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    /// Host labels overlaid with the collector's own
    pub fn metadata<I, K, V>(&self, extra: I) -> Arc<Metadata>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut metadata = self.host.clone();
        metadata.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        Arc::new(metadata)
    }

    pub async fn emit(&self, key: &SourceKey, raw: String, metadata: Arc<Metadata>) -> Admission {
        self.router
            .dispatch(key.as_str(), Chunk::new(raw, metadata))
            .await
    }

    /// The stream behind `key` has ended; flush and forget it
    pub async fn end(&self, key: &SourceKey) {
        self.router.close(key.as_str()).await;
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}
