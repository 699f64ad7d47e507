//! Wall-clock access pinned to the configured fixed UTC offset.

use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Source of "now" for the reconciler.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Real system time converted into a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock that only moves when told to. Used by tests and dry runs.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse an offset of the form `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => bail!("UTC offset '{}' must start with '+' or '-'", s),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => bail!("UTC offset '{}' must look like +HH:MM", s),
    };
    let hours: i32 = hours
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hours in UTC offset '{}'", s))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minutes in UTC offset '{}'", s))?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("UTC offset '{}' is out of range", s);
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("UTC offset '{}' is out of range", s))
}
