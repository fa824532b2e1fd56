use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::setup::{SessionStatusResponse, SetupResponse, ShutdownResponse},
    error::AppError,
    services::setup_service,
    state::SharedState,
};

/// Routes driving the game checkout, launch and teardown.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/setup", post(set_up_game))
        .route("/games/session", get(session))
        .route("/games/shutdown", post(shutdown))
}

/// Sync the game checkout, launch it and wait until it is healthy.
#[utoipa::path(
    post,
    path = "/games/setup",
    tag = "game",
    responses(
        (status = 200, description = "Game is up and the browser was opened", body = SetupResponse),
        (status = 409, description = "Another setup is in progress"),
        (status = 502, description = "Sync, launch or the game process failed"),
        (status = 504, description = "Game did not become healthy in time")
    )
)]
pub async fn set_up_game(
    State(state): State<SharedState>,
) -> Result<Json<SetupResponse>, AppError> {
    let report = setup_service::set_up_new_game(&state).await?;
    Ok(Json(report.into()))
}

/// Describe the current launch session and setup progress.
#[utoipa::path(
    get,
    path = "/games/session",
    tag = "game",
    responses((status = 200, description = "Current session", body = SessionStatusResponse))
)]
pub async fn session(State(state): State<SharedState>) -> Json<SessionStatusResponse> {
    let (session, setup) = setup_service::session_status(&state).await;
    Json(SessionStatusResponse {
        session: session.map(Into::into),
        setup,
    })
}

/// Destroy the game process and anything opened for it.
#[utoipa::path(
    post,
    path = "/games/shutdown",
    tag = "game",
    responses((status = 200, description = "Session torn down", body = ShutdownResponse))
)]
pub async fn shutdown(State(state): State<SharedState>) -> Json<ShutdownResponse> {
    let stopped = setup_service::shutdown_game(&state).await;
    Json(ShutdownResponse { stopped })
}
