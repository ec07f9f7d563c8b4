//! Citation-annotated records of physical actions.
//!
//! This is the only channel for "the agent did something verifiable".  It is
//! kept apart from the narrative journal so provenance can be audited
//! without wading through commentary.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::journal::DailyDocument;

/// Rendered in place of citations when an action references no paths.
pub const UNVERIFIED_MARKER: &str = "⚠️ 逻辑推演 (无物理引用)";
pub const DEFAULT_TASK: &str = "未命名";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(default)]
    pub task: Option<String>,
    /// Physical paths the action relied on, in the order consulted.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub success: bool,
}

/// `"citations": null` means the same as leaving the field out.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AgentAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            success: true,
            ..Default::default()
        }
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn cite(mut self, path: impl Into<String>) -> Self {
        self.citations.push(path.into());
        self
    }

    pub fn succeeded(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn is_evidence_backed(&self) -> bool {
        !self.citations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReceipt {
    pub path: PathBuf,
    pub evidence_backed: bool,
}

pub fn render_citations(citations: &[String]) -> String {
    if citations.is_empty() {
        return UNVERIFIED_MARKER.to_string();
    }
    citations
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_action(action: &AgentAction, timestamp: &str) -> String {
    let task = action
        .task
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TASK);
    format!(
        "\n### ⚡️ 物理操作 - {timestamp}\n- **任务**: {task}\n- **参考**: {citations}\n- **执行**: `{command}`\n- **结果**: {glyph}\n---\n",
        citations = render_citations(&action.citations),
        command = action.command,
        glyph = if action.success { "✅" } else { "❌" },
    )
}

#[derive(Debug, Clone)]
pub struct ActionRecorder {
    log: DailyDocument,
}

impl ActionRecorder {
    pub fn new(log: DailyDocument) -> Self {
        Self { log }
    }

    pub fn document(&self) -> &DailyDocument {
        &self.log
    }

    pub fn record(&self, action: &AgentAction) -> Result<ActionReceipt> {
        let entry = render_action(action, &self.log.clock().timestamp());
        let path = self.log.append(&entry)?;
        let evidence_backed = action.is_evidence_backed();
        if !evidence_backed {
            warn!(command = %action.command, "action recorded without physical citations");
        }
        Ok(ActionReceipt {
            path,
            evidence_backed,
        })
    }
}
