//! Wall-clock access and locale formatting.
//!
//! Every timestamp written to a journal, the handoff buffer or the
//! notification lock goes through [`LocaleClock`].  Two timezones are in
//! play:
//!
//! * the **display** zone, used for the human-readable stamp embedded in
//!   log entries (`2026/2/26 14:03:05`, the `zh-CN` locale shape), and
//! * the **calendar** zone, which decides which daily document an entry
//!   lands in and which hour the notification window sees.  It defaults to
//!   the process local time so day rollover happens at local midnight.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Default zone for rendered timestamps.
pub const DEFAULT_DISPLAY_TZ: Tz = chrono_tz::Asia::Shanghai;

const DISPLAY_FORMAT: &str = "%Y/%-m/%-d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.  Used by tests that exercise the time
/// window and cooldown gates.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Timezone used to derive calendar dates and hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    Local,
    Zone(Tz),
}

impl Calendar {
    /// Parse a calendar name.  `"local"` (or an empty string) selects the
    /// process timezone; anything else must be an IANA name.  Unrecognised
    /// names fall back to the process timezone with a warning.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("local") {
            return Calendar::Local;
        }
        match trimmed.parse::<Tz>() {
            Ok(tz) => Calendar::Zone(tz),
            Err(_) => {
                tracing::warn!(tz = %trimmed, "unrecognised calendar timezone, using local time");
                Calendar::Local
            }
        }
    }

    pub fn date(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            Calendar::Local => at.with_timezone(&Local).date_naive(),
            Calendar::Zone(tz) => at.with_timezone(tz).date_naive(),
        }
    }

    pub fn hour(&self, at: DateTime<Utc>) -> u32 {
        match self {
            Calendar::Local => at.with_timezone(&Local).hour(),
            Calendar::Zone(tz) => at.with_timezone(tz).hour(),
        }
    }
}

/// Parse an IANA display timezone, falling back to [`DEFAULT_DISPLAY_TZ`].
pub fn display_zone(name: &str) -> Tz {
    name.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(tz = %name, "unrecognised display timezone, falling back to Asia/Shanghai");
        DEFAULT_DISPLAY_TZ
    })
}

#[derive(Debug, Clone)]
pub struct LocaleClock {
    clock: Arc<dyn Clock>,
    display: Tz,
    calendar: Calendar,
}

impl Default for LocaleClock {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_DISPLAY_TZ, Calendar::Local)
    }
}

impl LocaleClock {
    pub fn new(clock: Arc<dyn Clock>, display: Tz, calendar: Calendar) -> Self {
        Self {
            clock,
            display,
            calendar,
        }
    }

    /// A clock frozen at `at`, with both display and calendar in `tz`.
    pub fn fixed(at: DateTime<Utc>, tz: Tz) -> Self {
        Self::new(Arc::new(FixedClock(at)), tz, Calendar::Zone(tz))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Human-readable stamp for the current instant.
    pub fn timestamp(&self) -> String {
        self.format_display(self.now())
    }

    pub fn format_display(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.display)
            .format(DISPLAY_FORMAT)
            .to_string()
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar.date(self.now())
    }

    /// Today's date as `YYYY-MM-DD`, the key for daily documents.
    pub fn today_label(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }

    pub fn current_hour(&self) -> u32 {
        self.calendar.hour(self.now())
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }
}
