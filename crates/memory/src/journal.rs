//! Append-only daily markdown documents.
//!
//! One file per calendar day.  The file is created with a title header the
//! first time anything is written that day and only ever appended to
//! afterwards.  The narrative journal and the raw action log are both
//! [`DailyDocument`]s; they differ only in directory, file prefix and header.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use sentinel_core::LocaleClock;

#[derive(Debug, Clone)]
pub struct DailyDocument {
    dir: PathBuf,
    prefix: String,
    header: fn(&str) -> String,
    clock: LocaleClock,
}

fn journal_header(date: &str) -> String {
    format!("# {date}: 操作日志\n\n")
}

fn action_log_header(date: &str) -> String {
    format!("# 小烛行动日志 - {date}\n\n")
}

impl DailyDocument {
    /// `<logs_dir>/<date>.md`
    pub fn journal(logs_dir: impl Into<PathBuf>, clock: LocaleClock) -> Self {
        Self {
            dir: logs_dir.into(),
            prefix: String::new(),
            header: journal_header,
            clock,
        }
    }

    /// `<raw_dir>/<prefix><date>.md`
    pub fn action_log(
        raw_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        clock: LocaleClock,
    ) -> Self {
        Self {
            dir: raw_dir.into(),
            prefix: prefix.into(),
            header: action_log_header,
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn clock(&self) -> &LocaleClock {
        &self.clock
    }

    pub fn path_for(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{}{date}.md", self.prefix))
    }

    pub fn today_path(&self) -> PathBuf {
        self.path_for(&self.clock.today_label())
    }

    /// Make sure today's document exists and return its path.
    ///
    /// Idempotent.  The file is opened with `create_new`, so when two
    /// processes race only one of them writes the header and an existing
    /// document is never truncated.
    pub fn ensure(&self) -> Result<PathBuf> {
        let date = self.clock.today_label();
        let path = self.path_for(&date);

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create log directory {}", self.dir.display()))?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all((self.header)(&date).as_bytes())
                    .with_context(|| format!("write header to {}", path.display()))?;
                debug!(path = %path.display(), "created daily document");
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(err).with_context(|| format!("create {}", path.display()));
            }
        }

        Ok(path)
    }

    /// Append `text` to today's document, creating it first if needed.
    /// Returns the path written to.
    pub fn append(&self, text: &str) -> Result<PathBuf> {
        let path = self.ensure()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {} for append", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("append to {}", path.display()))?;
        Ok(path)
    }
}
