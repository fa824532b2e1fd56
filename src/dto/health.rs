use serde::Serialize;
use utoipa::ToSchema;

/// State of the launched game as seen by `/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionHealth {
    /// Nothing has been launched yet (or it was shut down).
    None,
    /// The game process is running.
    Alive,
    /// The game process exited on its own.
    Dead,
}

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status of this service; always "ok" when it answers.
    pub status: String,
    /// Launch session state.
    pub session: SessionHealth,
}

impl HealthResponse {
    /// Create a health response indicating the service is operational.
    pub fn ok(session: SessionHealth) -> Self {
        Self {
            status: "ok".to_string(),
            session,
        }
    }
}
