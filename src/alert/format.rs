//! Telegram MarkdownV2 rendering for alert messages.
//!
//! Only interpolated values go through [`escape_markdown_v2`]; the fixed
//! scaffolding below is written pre-escaped.

use crate::storage::TransitionRecord;
use chrono::{DateTime, FixedOffset};

const SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

const SEPARATOR: &str = "\\-\\-\\-\\-\\-\\-\\-\\-\\-\\-\\-\\-\n";

/// Backslash-escape every MarkdownV2 control character in `text`.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Longest interpolated value, in chars, before it is cut short with `…`.
/// Keeps one block well inside a single Telegram message.
pub const MAX_VALUE_CHARS: usize = 200;

/// Escape `text`, cutting it to [`MAX_VALUE_CHARS`] first.
fn escape_clipped(text: &str) -> String {
    match text.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => {
            let mut out = escape_markdown_v2(&text[..cut]);
            out.push('…');
            out
        }
        None => escape_markdown_v2(text),
    }
}

/// One alert block for a single connector transition.
pub fn transition_block(t: &TransitionRecord) -> String {
    format!(
        "🔌 ID: `{id}`\n⏱ After: `{duration}`\nFrom {old}\nTo ➔ {new}\n{SEPARATOR}",
        id = escape_clipped(&t.connector_id),
        duration = escape_clipped(t.duration_label()),
        old = escape_clipped(t.old_status_label()),
        new = escape_clipped(&t.new_status),
    )
}

/// Header prepended to every batch of transition blocks.
pub fn batch_header(now: &DateTime<FixedOffset>) -> String {
    format!(
        "📊 *Connector status alert* \\({}\\)\n\n",
        escape_markdown_v2(&now.format("%H:%M").to_string())
    )
}

/// Header for the persistent source failure alert.
pub fn failure_header() -> String {
    "⚠️ *System alert: status API keeps failing*\n\n".to_string()
}

/// Body of the persistent source failure alert.
pub fn failure_block(failures: u32, error: &str) -> String {
    format!(
        "{} consecutive failures\n`{}`\n",
        failures,
        escape_clipped(error)
    )
}
