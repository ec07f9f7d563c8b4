//! Pure gate checks.  Each returns `Err(reason)` when the notification must
//! be suppressed; the gateway evaluates them in order and stops at the
//! first rejection.

use std::fmt;

use sentinel_config::NotifyConfig;

use crate::lock::NotificationLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// Notifications switched off in config.
    Disabled,
    /// No webhook endpoint configured.
    NotConfigured,
    OutsideWindow { hour: u32 },
    /// Same trimmed body as the last delivered notification.
    Duplicate,
    Cooldown { remaining_ms: i64 },
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::Disabled => write!(f, "notifications disabled"),
            SuppressReason::NotConfigured => write!(f, "no webhook configured"),
            SuppressReason::OutsideWindow { hour } => {
                write!(f, "outside delivery window (hour {hour:02})")
            }
            SuppressReason::Duplicate => write!(f, "duplicate of last notification"),
            SuppressReason::Cooldown { remaining_ms } => {
                write!(f, "cooling down ({}s left)", (remaining_ms + 999) / 1000)
            }
        }
    }
}

/// Returns `true` when `hour` falls within `[start_hour, end_hour)`.
/// Handles windows that wrap midnight (e.g. 22 → 6).
pub fn is_in_window(hour: u32, start_hour: u32, end_hour: u32) -> bool {
    if start_hour <= end_hour {
        hour >= start_hour && hour < end_hour
    } else {
        hour >= start_hour || hour < end_hour
    }
}

pub fn check_window(policy: &NotifyConfig, hour: u32) -> Result<(), SuppressReason> {
    if is_in_window(
        hour,
        policy.window_start_hour as u32,
        policy.window_end_hour as u32,
    ) {
        Ok(())
    } else {
        Err(SuppressReason::OutsideWindow { hour })
    }
}

pub fn check_duplicate(last: &NotificationLock, body: &str) -> Result<(), SuppressReason> {
    if body.trim() == last.body.trim() {
        Err(SuppressReason::Duplicate)
    } else {
        Ok(())
    }
}

pub fn check_cooldown(
    policy: &NotifyConfig,
    last: &NotificationLock,
    now_ms: i64,
) -> Result<(), SuppressReason> {
    let cooldown_ms = i64::try_from(policy.cooldown_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60 * 1000);
    // A lock stamped in the future is treated as stale so it cannot pin the gate.
    let elapsed = now_ms.saturating_sub(last.timestamp);
    if (0..cooldown_ms).contains(&elapsed) {
        Err(SuppressReason::Cooldown {
            remaining_ms: cooldown_ms - elapsed,
        })
    } else {
        Ok(())
    }
}
