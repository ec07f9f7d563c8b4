//! Context handoff buffer.
//!
//! A JSON array of timestamped objects persisted as one artifact.  Producers
//! append with [`ContextBuffer::push`]; a later process drains the whole
//! backlog with [`ContextBuffer::consume`], after which the artifact is gone.
//!
//! Read-modify-write cycles hold an exclusive advisory lock on a `.lock`
//! sidecar and replace the artifact via temp file + rename, so concurrent
//! producers do not lose each other's entries and readers never see a
//! half-written array.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use sentinel_core::LocaleClock;

pub type BufferEntry = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct ContextBuffer {
    path: PathBuf,
    clock: LocaleClock,
}

enum Snapshot {
    Absent,
    Entries(Vec<BufferEntry>),
    Corrupt(serde_json::Error),
}

/// Holds the sidecar lock until dropped.
struct BufferLock(File);

impl Drop for BufferLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl ContextBuffer {
    pub fn new(path: impl Into<PathBuf>, clock: LocaleClock) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let filename = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| ".context_buffer.json".to_string());
        self.path.with_file_name(format!("{filename}.{suffix}"))
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create buffer directory {}", parent.display()))?;
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<BufferLock> {
        self.ensure_parent()?;
        let lock_path = self.sibling("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("open buffer lock {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("lock {}", lock_path.display()))?;
        Ok(BufferLock(file))
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Snapshot::Absent),
            Err(err) => {
                return Err(err).with_context(|| format!("read buffer {}", self.path.display()));
            }
        };
        Ok(match serde_json::from_str::<Vec<BufferEntry>>(&raw) {
            Ok(entries) => Snapshot::Entries(entries),
            Err(err) => Snapshot::Corrupt(err),
        })
    }

    fn write_atomic(&self, entries: &[BufferEntry]) -> Result<()> {
        let rendered = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.sibling("tmp");

        let write_result: std::io::Result<()> = (|| {
            let mut file = File::create(&tmp_path)?;
            file.write_all(rendered.as_bytes())?;
            file.sync_all()
        })();
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(err).with_context(|| format!("write {}", tmp_path.display()));
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err).with_context(|| format!("replace {}", self.path.display()));
        }
        Ok(())
    }

    /// Move an unparsable artifact aside so the next producer starts clean
    /// and the bad bytes remain available for inspection.
    fn quarantine(&self, err: &serde_json::Error) {
        let corrupt_path = self.sibling("corrupt");
        warn!(
            path = %self.path.display(),
            error = %err,
            "context buffer corrupt, moving aside to {}",
            corrupt_path.display()
        );
        if let Err(err) = fs::rename(&self.path, &corrupt_path) {
            warn!(error = %err, "could not move corrupt buffer aside");
        }
    }

    /// Append `data` (with a `timestamp` key attached) and return the new
    /// backlog length.  Keys in `data` win over the attached timestamp.
    pub fn push(&self, data: BufferEntry) -> Result<usize> {
        let _guard = self.lock()?;

        let mut entries = match self.snapshot()? {
            Snapshot::Absent => Vec::new(),
            Snapshot::Entries(entries) => entries,
            Snapshot::Corrupt(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "context buffer corrupt, discarding"
                );
                Vec::new()
            }
        };

        let mut entry = BufferEntry::new();
        entry.insert("timestamp".to_string(), Value::String(self.clock.timestamp()));
        entry.extend(data);
        entries.push(entry);

        self.write_atomic(&entries)?;
        debug!(pending = entries.len(), "context pushed");
        Ok(entries.len())
    }

    /// Drain the backlog.  Returns `None` when nothing is pending.
    ///
    /// At-most-once: the artifact is deleted before the entries reach the
    /// caller.  Use [`ContextBuffer::consume_with`] when losing the backlog
    /// to a crash during processing is not acceptable.
    pub fn consume(&self) -> Result<Option<Vec<BufferEntry>>> {
        self.consume_with(|entries| Ok(entries.to_vec()))
    }

    /// At-least-once drain: `handler` sees the backlog first and the
    /// artifact is deleted only if it returns `Ok`.  On error the backlog is
    /// left in place for the next consumer.
    pub fn consume_with<T, F>(&self, handler: F) -> Result<Option<T>>
    where
        F: FnOnce(&[BufferEntry]) -> Result<T>,
    {
        let _guard = self.lock()?;

        let entries = match self.snapshot()? {
            Snapshot::Absent => return Ok(None),
            Snapshot::Corrupt(err) => {
                self.quarantine(&err);
                return Ok(None);
            }
            Snapshot::Entries(entries) => entries,
        };

        let output = handler(&entries)?;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("remove {}", self.path.display()));
            }
        }
        debug!(drained = entries.len(), "context buffer consumed");
        Ok(Some(output))
    }

    /// Read the backlog without draining it.
    pub fn peek(&self) -> Result<Vec<BufferEntry>> {
        Ok(match self.snapshot()? {
            Snapshot::Entries(entries) => entries,
            Snapshot::Absent | Snapshot::Corrupt(_) => Vec::new(),
        })
    }
}
