use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Paths ────────────────────────────────────────────────────────────────────

/// Filesystem layout.  Relative entries are resolved against `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root.  Overridden by `SENTINEL_ROOT` when set.
    pub root: String,
    /// Directory holding one narrative journal per day.
    pub logs_dir: String,
    /// Subdirectory of `logs_dir` holding the raw action logs.
    pub raw_logs_subdir: String,
    /// File name prefix for raw action logs (`<prefix><date>.md`).
    pub action_log_prefix: String,
    pub buffer_file: String,
    pub lock_file: String,
    /// Dotenv-style file carrying `LARK_WEBHOOK_URL`.
    pub secrets_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            logs_dir: "docs/memory/logs".to_string(),
            raw_logs_subdir: "raw".to_string(),
            action_log_prefix: "candy-".to_string(),
            buffer_file: ".context_buffer.json".to_string(),
            lock_file: ".last_notif.json".to_string(),
            secrets_file: "docs/secrets/lark.env".to_string(),
        }
    }
}

impl PathsConfig {
    fn under_root(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.root).join(path)
        }
    }

    pub fn resolve(&self) -> ResolvedPaths {
        let logs_dir = self.under_root(&self.logs_dir);
        ResolvedPaths {
            raw_logs_dir: logs_dir.join(&self.raw_logs_subdir),
            logs_dir,
            action_log_prefix: self.action_log_prefix.clone(),
            buffer_file: self.under_root(&self.buffer_file),
            lock_file: self.under_root(&self.lock_file),
            secrets_file: self.under_root(&self.secrets_file),
        }
    }
}

/// Absolute-or-root-relative paths handed to each component at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub raw_logs_dir: PathBuf,
    pub action_log_prefix: String,
    pub buffer_file: PathBuf,
    pub lock_file: PathBuf,
    pub secrets_file: PathBuf,
}

// ── Clock ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// IANA zone for rendered timestamps inside log entries.
    pub display_timezone: String,
    /// Zone deciding day rollover and the notification window hour.
    /// `"local"` means the process timezone.
    pub calendar_timezone: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            display_timezone: "Asia/Shanghai".to_string(),
            calendar_timezone: "local".to_string(),
        }
    }
}

// ── Notifications ────────────────────────────────────────────────────────────

/// Delivery policy for the webhook gateway.
///
/// | Gate        | Field(s)                                   |
/// |-------------|--------------------------------------------|
/// | window      | `window_start_hour` .. `window_end_hour`   |
/// | cooldown    | `cooldown_minutes`                         |
/// | transport   | `max_body_chars`, `timeout_secs`           |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Master switch.  When `false` the gateway behaves as if no webhook
    /// were configured.
    pub enabled: bool,
    /// First hour (local, inclusive) at which notifications may go out.
    pub window_start_hour: u8,
    /// Hour (local, exclusive) at which the window closes.  May be smaller
    /// than `window_start_hour` for windows that wrap midnight.
    pub window_end_hour: u8,
    /// Minimum gap between two delivered notifications.
    pub cooldown_minutes: u64,
    /// Body characters kept in the outbound payload.
    pub max_body_chars: usize,
    /// Upper bound on the webhook round trip.
    pub timeout_secs: u64,
    /// Prefix prepended to every notification title.
    pub title_banner: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_start_hour: 10,
            window_end_hour: 20,
            cooldown_minutes: 5,
            max_body_chars: 1000,
            timeout_secs: 10,
            title_banner: "🧠 大脑同步".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentinelConfig {
    pub paths: PathsConfig,
    pub clock: ClockConfig,
    pub notify: NotifyConfig,
    pub telemetry: TelemetryConfig,
}

impl SentinelConfig {
    /// Load from a TOML file.  A missing file yields defaults; a file that
    /// exists but does not parse is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(root) = env::var("SENTINEL_ROOT") {
            if !root.trim().is_empty() {
                config.paths.root = root;
            }
        }

        if let Ok(level) = env::var("SENTINEL_LOG") {
            if !level.trim().is_empty() {
                config.telemetry.log_level = level;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Convenience for callers that only know the project root.
    pub fn with_root(root: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.paths.root = root.into();
        config
    }

    pub fn paths(&self) -> ResolvedPaths {
        self.paths.resolve()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
