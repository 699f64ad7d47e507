//! Alert selection and message formatting.

pub mod format;

use crate::status::mapper::{OFFLINE, ONLINE};
use crate::storage::TransitionRecord;

/// Decides which transitions are worth a notification.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    pub offline_label: String,
    pub online_label: String,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            offline_label: OFFLINE.to_string(),
            online_label: ONLINE.to_string(),
        }
    }
}

impl AlertPolicy {
    /// A connector going offline, or coming back from offline to online.
    pub fn should_alert(&self, t: &TransitionRecord) -> bool {
        let to_offline = t.new_status == self.offline_label;
        let recovered = t.old_status.as_deref() == Some(self.offline_label.as_str())
            && t.new_status == self.online_label;
        to_offline || recovered
    }
}
