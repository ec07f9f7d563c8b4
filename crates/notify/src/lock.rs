//! Persisted record of the last delivered notification.
//!
//! The lock file is the only cross-invocation memory the gateway has.  A
//! missing or unreadable file is treated as "never notified"; the next
//! successful delivery overwrites it, so corruption heals itself.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::NotifyError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationLock {
    /// Epoch millis of the last successful delivery.
    pub timestamp: i64,
    /// Trimmed body of that delivery.
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> NotificationLock {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return NotificationLock::default();
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "notification lock unreadable, treating as empty"
                );
                return NotificationLock::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "notification lock corrupt, treating as empty"
            );
            NotificationLock::default()
        })
    }

    /// Replace the lock.  The record is written to a per-write `.tmp`
    /// sibling (unique across processes and tasks), synced, then renamed over
    /// the target, so readers see either the old record or the new one.
    pub async fn store(&self, lock: &NotificationLock) -> Result<(), NotifyError> {
        let rendered = serde_json::to_string(lock)?;
        let lock_err = |source| NotifyError::Lock {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(lock_err)?;
            }
        }

        let tmp_path = {
            let filename = self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| ".last_notif.json".to_string());
            let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
            self.path
                .with_file_name(format!("{filename}.{}.{seq}.tmp", std::process::id()))
        };

        let write_result: std::io::Result<()> = async {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)
                .await?;
            file.write_all(rendered.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(lock_err(err));
        }

        if let Err(err) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(lock_err(err));
        }

        Ok(())
    }
}
