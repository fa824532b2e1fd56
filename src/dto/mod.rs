use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// SSE clock payloads and query parameters.
pub mod clock;
/// Health check payload.
pub mod health;
/// Setup, session and shutdown payloads.
pub mod setup;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
