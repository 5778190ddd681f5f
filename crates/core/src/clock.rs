//! Injected time sources and the configured presentation zone.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The zone timestamps are rendered in and naive dates are read in.
///
/// Stored data is always UTC; this is only applied at the boundary. A named
/// zone resolves its offset per instant, so daylight saving is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// UTC offset in effect at `ts`.
    pub fn offset_at(&self, ts: DateTime<Utc>) -> FixedOffset {
        match self {
            Self::Named(tz) => tz.offset_from_utc_datetime(&ts.naive_utc()).fix(),
            Self::Fixed(offset) => *offset,
        }
    }

    /// Render a UTC timestamp as local ISO-8601.
    pub fn render(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset_at(ts)).to_rfc3339()
    }

    pub fn render_opt(&self, ts: Option<DateTime<Utc>>) -> Option<String> {
        ts.map(|t| self.render(t))
    }

    /// Interpret a naive local time in this zone and convert it to UTC.
    ///
    /// A wall time repeated when clocks go back resolves to the standard
    /// time occurrence (the later instant); a time skipped when clocks go
    /// forward is rejected.
    pub fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>> {
        let resolved = match self {
            Self::Named(tz) => resolve(tz.from_local_datetime(&local)),
            Self::Fixed(offset) => resolve(offset.from_local_datetime(&local)),
        };
        resolved.ok_or_else(|| {
            Error::validation(format!("local time {} does not exist in {}", local, self))
        })
    }
}

fn resolve<T: TimeZone>(local: LocalResult<DateTime<T>>) -> Option<DateTime<Utc>> {
    match local {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => Some(a.max(b).with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => write!(f, "{}", tz.name()),
            Self::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl FromStr for LocalZone {
    type Err = Error;

    /// Parses an IANA zone name (`Australia/Melbourne`), `UTC`, or a fixed
    /// offset such as `+10:00`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }
        if let Ok(tz) = s.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        s.parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|_| Error::validation(format!("unknown time zone '{}'", s)))
    }
}
