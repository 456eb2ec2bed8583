//! Pre-built [`tracing::Span`] constructors for coordinator operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! the log lines of one attempt.

use tracing::{info_span, Span};

/// Span covering one vote attempt, from receipt to commit or rejection.
pub fn vote_span(code: &str, user: &str) -> Span {
    info_span!("vote", code = %code, user = %user)
}

/// Span covering one event creation.
pub fn create_event_span(code: &str, organizer: &str) -> Span {
    info_span!("create_event", code = %code, organizer = %organizer)
}

/// Span covering a single remote ledger call.
pub fn remote_call_span(bridge: &str, method: &str) -> Span {
    info_span!("remote_call", bridge = %bridge, method = %method)
}

/// Span covering an organizer audit.
pub fn audit_span(code: &str) -> Span {
    info_span!("audit", code = %code)
}
