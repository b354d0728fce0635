//! Shared notification content templates
//!
//! Canonical content generators for fight call notifications, used by every
//! sender implementation.

use crate::FightCall;

/// Sender address used when none is configured
pub const DEFAULT_FROM_ADDRESS: &str = "notification@backend.guard-lite.com";

/// Subject line of the fight call notification
pub const FIGHT_CALL_SUBJECT: &str = "New fight challenge";

/// Shown in place of a project without a display name
const UNKNOWN_PROJECT: &str = "not accessible";

/// Generate plain-text body for a fight call notification.
pub fn fight_call_text(call: &FightCall) -> String {
    format!(
        "You were challenged to a fight by {} in project {}.",
        call.challenger_label(),
        call.project_name.as_deref().unwrap_or(UNKNOWN_PROJECT)
    )
}

/// Generate HTML body for a fight call notification.
pub fn fight_call_html(call: &FightCall) -> String {
    let project = match call.project_name.as_deref() {
        Some(name) => name.to_string(),
        None => format!("<b>{}</b>", UNKNOWN_PROJECT),
    };
    format!(
        "<p>You were challenged to a fight by <strong>{}</strong> in project {}.</p>",
        call.challenger_label(),
        project
    )
}
