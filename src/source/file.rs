use super::{SourceContext, SourceError, SourceKey};
use crate::config::types::{FileSourceConfig, ReadStart};
use std::fs::{File, Metadata};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    Line(String),
    /// The file was replaced or truncated; later lines belong to a new key
    Rotated,
    /// End of file and not following
    Eof,
}

/// Line-by-line reader over a growing file.
///
/// Follows across rotation (inode change) and truncation by reopening from
/// the beginning; each reopen bumps the generation so the new file gets its
/// own source key.
pub struct FileTail {
    source_id: String,
    path: PathBuf,
    start: ReadStart,
    follow: bool,

    file: Option<BufReader<File>>,
    file_inode: Option<u64>,
    offset: u64,
    pending: Vec<u8>,
    generation: u64,
    missing_logged: bool,
}

impl FileTail {
    pub fn new(source_id: impl Into<String>, config: &FileSourceConfig) -> Self {
        Self {
            source_id: source_id.into(),
            path: config.path.clone(),
            start: config.start,
            follow: config.follow,
            file: None,
            file_inode: None,
            offset: 0,
            pending: Vec::new(),
            generation: 0,
            missing_logged: false,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> SourceKey {
        SourceKey::file(&self.source_id, self.generation)
    }

    /// Open the file and seek to the configured start
    pub fn open(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path)?;
        self.file_inode = Some(get_inode(&file.metadata()?));

        let mut reader = BufReader::new(file);
        self.offset = match self.start {
            ReadStart::Beginning => reader.seek(SeekFrom::Start(0))?,
            ReadStart::End => reader.seek(SeekFrom::End(0))?,
        };

        debug!(
            source_id = %self.source_id,
            path = %self.path.display(),
            offset = self.offset,
            "Opened file"
        );
        self.file = Some(reader);
        Ok(())
    }

    pub async fn next_event(&mut self) -> Result<TailEvent, SourceError> {
        loop {
            let Some(reader) = self.file.as_mut() else {
                match self.open() {
                    Ok(()) => continue,
                    Err(SourceError::Io(e)) if e.kind() == ErrorKind::NotFound && self.follow => {
                        if !self.missing_logged {
                            warn!(path = %self.path.display(), "File not found, waiting for it");
                            self.missing_logged = true;
                        }
                        sleep(POLL_INTERVAL).await;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };

            let bytes_read = reader.read_until(b'\n', &mut self.pending)?;

            if bytes_read > 0 {
                self.offset += bytes_read as u64;
                if self.pending.ends_with(b"\n") {
                    return Ok(TailEvent::Line(self.take_pending()));
                }
                // Partial line; the writer has not finished it yet
                continue;
            }

            if !self.follow {
                if !self.pending.is_empty() {
                    return Ok(TailEvent::Line(self.take_pending()));
                }
                return Ok(TailEvent::Eof);
            }

            if self.check_rotation()? {
                if !self.pending.is_empty() {
                    return Ok(TailEvent::Line(self.take_pending()));
                }
                self.reopen_from_start();
                return Ok(TailEvent::Rotated);
            }

            sleep(POLL_INTERVAL).await;
        }
    }

    /// Invalid UTF-8 becomes U+FFFD rather than ending the source
    fn take_pending(&mut self) -> String {
        let line = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&line)
            .trim_end_matches(&['\n', '\r'][..])
            .to_string()
    }

    fn reopen_from_start(&mut self) {
        self.file = None;
        self.file_inode = None;
        self.offset = 0;
        self.start = ReadStart::Beginning;
        self.generation += 1;
    }

    /// Inode changed, or the file shrank below what was already read
    fn check_rotation(&self) -> Result<bool, SourceError> {
        let Some(original_inode) = self.file_inode else {
            return Ok(false);
        };
        match std::fs::metadata(&self.path) {
            Ok(metadata) => {
                Ok(get_inode(&metadata) != original_inode || metadata.len() < self.offset)
            }
            // Moved away and not recreated yet
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Forward every line of `tail` until it ends or shutdown is requested
pub async fn run_file_source(mut tail: FileTail, ctx: Arc<SourceContext>) -> Result<(), SourceError> {
    if ctx.is_ignored(tail.source_id()) {
        info!(source_id = %tail.source_id(), "File source ignored");
        return Ok(());
    }

    let metadata = ctx.metadata([
        ("file_path".to_string(), tail.path().display().to_string()),
        ("source_id".to_string(), tail.source_id().to_string()),
    ]);
    info!(source_id = %tail.source_id(), path = %tail.path().display(), "Tailing file");

    loop {
        let key = tail.key();
        let event = tokio::select! {
            _ = ctx.shutdown().cancelled() => break,
            event = tail.next_event() => event,
        };

        match event {
            Ok(TailEvent::Line(line)) => {
                ctx.emit(&key, line, Arc::clone(&metadata)).await;
            }
            Ok(TailEvent::Rotated) => {
                info!(
                    source_id = %tail.source_id(),
                    generation = tail.generation(),
                    "File rotated, reopening"
                );
                ctx.end(&key).await;
            }
            Ok(TailEvent::Eof) => {
                ctx.end(&key).await;
                info!(source_id = %tail.source_id(), "Reached end of file");
                break;
            }
            Err(e) => {
                error!(source_id = %tail.source_id(), error = %e, "File source failed");
                ctx.end(&key).await;
                return Err(e);
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn get_inode(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn get_inode(metadata: &Metadata) -> u64 {
    // No inode; creation time changes when the file is replaced
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    if let Ok(created) = metadata.created() {
        created.hash(&mut hasher);
    }
    hasher.finish()
}
