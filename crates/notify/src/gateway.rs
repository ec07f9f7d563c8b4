//! The notification gateway.
//!
//! Gates run in a fixed order and the first one that objects wins:
//!
//! 1. configuration: no webhook (or notifications disabled) is a silent no-op
//! 2. time window: only between `window_start_hour` and `window_end_hour`
//! 3. duplicate content: identical trimmed body to the last delivery
//! 4. cooldown: too soon after the last delivery
//! 5. delivery: POST, then overwrite the lock on success
//!
//! [`NotificationGateway::notify`] never returns an error.  Failures are
//! logged and reported through [`NotifyOutcome::Failed`] so callers and
//! tests can still see why nothing went out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use sentinel_config::{NotifyConfig, SentinelConfig};
use sentinel_core::LocaleClock;

use crate::error::NotifyError;
use crate::lock::{LockFile, NotificationLock};
use crate::payload::{lark_post, truncate_chars};
use crate::policy::{self, SuppressReason};
use crate::secrets::{WEBHOOK_KEY, resolve_webhook_url};
use crate::transport::{HttpTransport, Transport};

/// Title used when the caller supplies none.
pub const DEFAULT_TITLE: &str = "系统记录";

#[derive(Debug)]
pub enum NotifyOutcome {
    Delivered,
    Suppressed(SuppressReason),
    Failed(NotifyError),
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered)
    }

    pub fn suppress_reason(&self) -> Option<&SuppressReason> {
        match self {
            NotifyOutcome::Suppressed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Delivered => write!(f, "delivered"),
            NotifyOutcome::Suppressed(reason) => write!(f, "suppressed: {reason}"),
            NotifyOutcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

pub struct NotificationGateway {
    policy: NotifyConfig,
    secrets_file: PathBuf,
    webhook_override: Option<String>,
    lock: LockFile,
    clock: LocaleClock,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for NotificationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationGateway")
            .field("policy", &self.policy)
            .field("secrets_file", &self.secrets_file)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl NotificationGateway {
    pub fn new(
        policy: NotifyConfig,
        secrets_file: impl Into<PathBuf>,
        lock: LockFile,
        clock: LocaleClock,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            policy,
            secrets_file: secrets_file.into(),
            webhook_override: None,
            lock,
            clock,
            transport,
        }
    }

    /// Build the HTTP-backed gateway.  `LARK_WEBHOOK_URL` in the environment
    /// is captured here and takes precedence over the secrets file.
    pub fn from_config(config: &SentinelConfig, clock: LocaleClock) -> anyhow::Result<Self> {
        let paths = config.paths();
        let transport = HttpTransport::new(Duration::from_secs(config.notify.timeout_secs))?;
        Ok(Self::new(
            config.notify.clone(),
            paths.secrets_file,
            LockFile::new(paths.lock_file),
            clock,
            Arc::new(transport),
        )
        .with_webhook_override(std::env::var(WEBHOOK_KEY).ok()))
    }

    pub fn with_webhook_override(mut self, url: Option<String>) -> Self {
        self.webhook_override = url;
        self
    }

    pub fn secrets_file(&self) -> &Path {
        &self.secrets_file
    }

    pub fn lock_file(&self) -> &LockFile {
        &self.lock
    }

    pub fn last_notification(&self) -> NotificationLock {
        self.lock.load()
    }

    pub fn webhook_url(&self) -> Result<Option<String>, NotifyError> {
        resolve_webhook_url(&self.secrets_file, self.webhook_override.clone())
    }

    pub async fn notify(&self, title: Option<&str>, body: &str) -> NotifyOutcome {
        let outcome = match self.run(title, body).await {
            Ok(outcome) => outcome,
            Err(err) => NotifyOutcome::Failed(err),
        };

        match &outcome {
            NotifyOutcome::Delivered => info!(chars = body.chars().count(), "notification delivered"),
            NotifyOutcome::Suppressed(reason) => debug!(%reason, "notification suppressed"),
            NotifyOutcome::Failed(err) => warn!(error = %err, "notification failed"),
        }
        outcome
    }

    async fn run(&self, title: Option<&str>, body: &str) -> Result<NotifyOutcome, NotifyError> {
        if !self.policy.enabled {
            return Ok(NotifyOutcome::Suppressed(SuppressReason::Disabled));
        }

        let Some(url) = self.webhook_url()? else {
            return Ok(NotifyOutcome::Suppressed(SuppressReason::NotConfigured));
        };

        let gates = policy::check_window(&self.policy, self.clock.current_hour()).and_then(|()| {
            let last = self.lock.load();
            policy::check_duplicate(&last, body)?;
            policy::check_cooldown(&self.policy, &last, self.clock.now_millis())
        });
        if let Err(reason) = gates {
            return Ok(NotifyOutcome::Suppressed(reason));
        }

        let title = format!(
            "{}: {}",
            self.policy.title_banner,
            title.filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_TITLE)
        );
        let payload = lark_post(&title, truncate_chars(body, self.policy.max_body_chars));
        self.transport.post_json(&url, &payload).await?;

        self.lock
            .store(&NotificationLock {
                timestamp: self.clock.now_millis(),
                body: body.trim().to_string(),
            })
            .await?;

        Ok(NotifyOutcome::Delivered)
    }
}
