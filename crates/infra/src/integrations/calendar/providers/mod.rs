//! Provider adapters implementing `RemoteEventSource`

pub mod google;
pub mod microsoft;

use tracing::warn;

pub use google::GoogleEventSource;
pub use microsoft::MicrosoftEventSource;

/// `None` for missing or whitespace-only strings.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trimmed attendee email, or `None` when it is empty.
///
/// Malformed addresses (missing @) are logged but kept, provider data is
/// canonical.
fn clean_attendee_email(email: Option<&str>, event_id: &str) -> Option<String> {
    let trimmed = email.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        warn!(event_id, "empty attendee email");
        return None;
    }
    if !trimmed.contains('@') {
        warn!(event_id, email = trimmed, "attendee email missing @ symbol");
    }
    Some(trimmed.to_string())
}
