use super::{SourceContext, SourceError, SourceKey};
use crate::config::types::JournaldConfig;
use crate::pipeline::orchestrator::Metadata;
use serde_json::Value;
use std::collections::BTreeSet;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One decoded journal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub identifier: String,
    pub message: String,
    pub metadata: Metadata,
}

impl JournalEntry {
    pub fn key(&self) -> SourceKey {
        SourceKey::journald(&self.identifier)
    }
}

/// Decode one line of `journalctl -o json` output. Entries without a
/// message yield `None`.
pub fn parse_journal_line(line: &str) -> Result<Option<JournalEntry>, SourceError> {
    let fields: serde_json::Map<String, Value> = serde_json::from_str(line)?;

    let Some(message) = field(&fields, "MESSAGE").filter(|m| !m.is_empty()) else {
        return Ok(None);
    };

    let identifier = field(&fields, "SYSLOG_IDENTIFIER").unwrap_or_else(|| "unknown".to_string());
    let metadata = Metadata::from([
        (
            "priority".to_string(),
            field(&fields, "PRIORITY").unwrap_or_else(|| "unknown".to_string()),
        ),
        (
            "unit".to_string(),
            field(&fields, "_SYSTEMD_UNIT").unwrap_or_default(),
        ),
        ("pid".to_string(), field(&fields, "_PID").unwrap_or_default()),
        ("uid".to_string(), field(&fields, "_UID").unwrap_or_default()),
        ("journal".to_string(), "true".to_string()),
    ]);

    Ok(Some(JournalEntry {
        identifier,
        message,
        metadata,
    }))
}

/// journalctl writes non-UTF-8 values as byte arrays
fn field(fields: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            bytes.map(|b| String::from_utf8_lossy(&b).into_owned())
        }
        _ => None,
    }
}

pub fn journalctl_command(config: &JournaldConfig) -> Command {
    let mut command = Command::new("journalctl");
    command.args(["-o", "json", "-f", "-n", "0"]);
    for unit in &config.units {
        command.arg("-u").arg(unit);
    }
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

/// Follow the system journal until shutdown or until journalctl exits
pub async fn run_journald_source(
    config: &JournaldConfig,
    ctx: Arc<SourceContext>,
) -> Result<(), SourceError> {
    let mut child = journalctl_command(config)
        .spawn()
        .map_err(|source| SourceError::Spawn {
            command: "journalctl".to_string(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| {
        SourceError::Exited("journalctl stdout was not captured".to_string())
    })?;
    let mut lines = BufReader::new(stdout).lines();
    let mut seen: BTreeSet<SourceKey> = BTreeSet::new();

    info!(units = ?config.units, "Following system journal");

    let result = loop {
        let line = tokio::select! {
            _ = ctx.shutdown().cancelled() => break Ok(()),
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                let status = child.wait().await?;
                break Err(SourceError::Exited(status.to_string()));
            }
            Err(e) => break Err(e.into()),
        };

        let entry = match parse_journal_line(&line) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable journal line");
                continue;
            }
        };

        if ctx.is_ignored(&entry.identifier) || ctx.is_ignored(&entry.metadata["unit"]) {
            debug!(identifier = %entry.identifier, "Journal entry from ignored source");
            continue;
        }

        let key = entry.key();
        let metadata = ctx.metadata(entry.metadata);
        ctx.emit(&key, entry.message, metadata).await;
        seen.insert(key);
    };

    if result.is_err() {
        for key in &seen {
            ctx.end(key).await;
        }
    }
    result
}
