//! Id and timestamp helpers shared across the gateway.

use uuid::Uuid;

/// Current time as an ISO-8601 / RFC-3339 string in UTC.
///
/// Used whenever an [`crate::Invocation`] is constructed without an explicit
/// timestamp, and by the audit layer to stamp emitted events.
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// A fresh request correlation id (UUID v4), for callers that don't supply
/// their own.
#[must_use]
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}
