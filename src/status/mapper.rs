//! Raw upstream status -> canonical display label.

/// Canonical label for a connector that is reachable and idle.
pub const ONLINE: &str = "online";
/// Canonical label for a connector the backend reports as unavailable.
pub const OFFLINE: &str = "offline";

/// Prefix for raw labels missing from [`STATUS_TABLE`].
pub const UNKNOWN_PREFIX: &str = "unknown:";

/// Known OCPP-style `detailedStatus` values.
pub const STATUS_TABLE: &[(&str, &str)] = &[
    ("Available", ONLINE),
    ("Preparing", "preparing"),
    ("Charging", "charging"),
    ("SuspendedEVSE", "suspended_evse"),
    ("SuspendedEV", "suspended_ev"),
    ("Finishing", "finishing"),
    ("Reserved", "reserved"),
    ("Unavailable", OFFLINE),
    ("Faulted", "faulted"),
];

/// Map a raw label to its canonical form. Unknown labels are kept visible as
/// `unknown:<raw>` rather than dropped.
pub fn map_status(raw: &str) -> String {
    STATUS_TABLE
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| format!("{UNKNOWN_PREFIX}{raw}"))
}
