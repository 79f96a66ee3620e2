use std::time::Duration;

use tracing::{info, warn};
use unical_domain::UnicalError;

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"events::events_in_range"`).
/// * `elapsed` - Duration the command execution took.
/// * `error` - The failure, if any.
///
/// Callers must avoid forwarding account emails or tokens in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&UnicalError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => warn!(
            command,
            duration_ms,
            error_kind = err.kind(),
            retryable = err.is_retryable(),
            "command_execution_failure"
        ),
    }
}
