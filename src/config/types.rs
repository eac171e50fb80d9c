use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sender: SenderConfig,
    pub pipeline: PipelineConfig,
    pub sources: SourcesConfig,
    /// Static labels added to every entry; collector metadata wins on conflict
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(with = "humantime_serde")]
    pub dedup_ttl: Duration,
    /// Minimum time between sweeps of expired dedup entries; 0 sweeps on
    /// every lookup
    #[serde(with = "humantime_serde")]
    pub dedup_sweep_interval: Duration,
    /// Bound of each per-source queue
    pub queue_capacity: usize,
    pub backpressure: BackpressureStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup_ttl: Duration::from_secs(15),
            dedup_sweep_interval: Duration::ZERO,
            queue_capacity: 1024,
            backpressure: BackpressureStrategy::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressureStrategy {
    /// Wait for room in the source queue
    #[default]
    Block,
    /// Discard the chunk when the source queue is full
    Drop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub files: HashMap<String, FileSourceConfig>,
    pub journald: JournaldConfig,
    /// Source ids (file ids, journal identifiers) that are never forwarded
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub start: ReadStart,
    #[serde(default = "default_follow")]
    pub follow: bool,
}

fn default_follow() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStart {
    Beginning,
    #[default]
    End,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournaldConfig {
    pub enabled: bool,
    /// Restrict to these systemd units; empty follows the whole journal
    pub units: Vec<String>,
}
