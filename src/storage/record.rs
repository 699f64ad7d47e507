//! Connector state and transition record types.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// `Timestamp` column format, always in the configured fixed offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Written in place of `OldStatus`/`Duration` when a connector had no prior record.
pub const NO_PRIOR: &str = "N/A";

/// Last observed canonical status of one connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorState {
    pub id: String,
    pub status: String,
    pub since: DateTime<FixedOffset>,
}

/// One row of the transition log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub connector_id: String,
    /// `None` when the connector had never been seen before.
    pub old_status: Option<String>,
    pub new_status: String,
    /// Formatted time spent in `old_status`; `None` alongside `old_status`.
    pub duration: Option<String>,
}

impl TransitionRecord {
    /// Build the record for a connector observed in `new_status` at `now`.
    ///
    /// The timestamp never goes below `prior.since`, so a clock stepped
    /// backwards cannot reorder a connector's records on replay.
    pub fn observed(
        now: DateTime<FixedOffset>,
        connector_id: &str,
        prior: Option<&ConnectorState>,
        new_status: &str,
    ) -> Self {
        let now = prior.map_or(now, |p| now.max(p.since));
        Self {
            timestamp: now,
            connector_id: connector_id.to_string(),
            old_status: prior.map(|p| p.status.clone()),
            new_status: new_status.to_string(),
            duration: prior.map(|p| format_elapsed(now - p.since)),
        }
    }

    /// The connector state this record leaves behind.
    pub fn to_state(&self) -> ConnectorState {
        ConnectorState {
            id: self.connector_id.clone(),
            status: self.new_status.clone(),
            since: self.timestamp,
        }
    }

    pub fn old_status_label(&self) -> &str {
        self.old_status.as_deref().unwrap_or(NO_PRIOR)
    }

    pub fn duration_label(&self) -> &str {
        self.duration.as_deref().unwrap_or(NO_PRIOR)
    }
}

/// Render an elapsed time as days, hours and minutes, e.g. `2 days 3 hours 5 minutes`.
///
/// Seconds are discarded. Zero days/hours are omitted; minutes are always
/// present, so zero renders as `0 minutes`. Negative spans render as zero.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_minutes = elapsed.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(unit(days, "day"));
    }
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    parts.push(unit(minutes, "minute"));
    parts.join(" ")
}

fn unit(n: i64, name: &str) -> String {
    if n == 1 {
        format!("{n} {name}")
    } else {
        format!("{n} {name}s")
    }
}
