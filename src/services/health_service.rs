use tracing::warn;

use crate::{
    dto::health::{HealthResponse, SessionHealth},
    state::{SharedState, readiness::Liveness},
};

/// Report service health along with whether the launched game is still running.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let session = match state.sessions().current().await {
        None => SessionHealth::None,
        Some(session) if session.is_alive() => SessionHealth::Alive,
        Some(session) => {
            warn!(session = %session.id(), code = ?session.exit_code(), "game process is no longer running");
            SessionHealth::Dead
        }
    };

    HealthResponse::ok(session)
}
