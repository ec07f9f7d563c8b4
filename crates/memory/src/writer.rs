//! Narrative journal entries with an optional evidence trace.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::warn;

use sentinel_notify::{NotificationGateway, NotifyOutcome};

use crate::journal::DailyDocument;

pub const DEFAULT_TITLE: &str = "系统记录";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContent {
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    /// Evidence trace: what was searched before writing this entry.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl LogContent {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub notify: bool,
}

#[derive(Debug)]
pub struct LogReceipt {
    pub path: PathBuf,
    /// Present when a notification was requested and spawned.  Awaiting it
    /// is optional; the journal entry is already durable.
    pub notification: Option<JoinHandle<NotifyOutcome>>,
}

pub fn render_evidence(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let trace = sources
        .iter()
        .map(|s| format!("`{s}`"))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("\n> **[Sources Searched]**: {trace}\n")
}

pub fn render_entry(content: &LogContent, timestamp: &str) -> String {
    let title = content
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    format!(
        "\n## 🔄 {title} - {timestamp}\n{evidence}\n{body}\n\n---\n",
        evidence = render_evidence(&content.sources),
        body = content.body,
    )
}

#[derive(Debug, Clone)]
pub struct LogWriter {
    journal: DailyDocument,
    notifier: Option<Arc<NotificationGateway>>,
}

impl LogWriter {
    pub fn new(journal: DailyDocument, notifier: Option<Arc<NotificationGateway>>) -> Self {
        Self { journal, notifier }
    }

    pub fn journal(&self) -> &DailyDocument {
        &self.journal
    }

    /// Append `content` to today's journal.  Write failures propagate; the
    /// optional notification runs in the background and cannot fail the
    /// write.
    pub fn write(&self, content: &LogContent, options: LogOptions) -> Result<LogReceipt> {
        let entry = render_entry(content, &self.journal.clock().timestamp());
        let path = self.journal.append(&entry)?;

        let notification = if options.notify {
            self.spawn_notification(content)
        } else {
            None
        };

        Ok(LogReceipt { path, notification })
    }

    fn spawn_notification(&self, content: &LogContent) -> Option<JoinHandle<NotifyOutcome>> {
        let Some(gateway) = self.notifier.clone() else {
            warn!("notification requested but no gateway is attached");
            return None;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("notification requested outside a tokio runtime; skipping");
            return None;
        };

        let title = content.title.clone();
        let body = content.body.clone();
        Some(runtime.spawn(async move { gateway.notify(title.as_deref(), &body).await }))
    }
}
