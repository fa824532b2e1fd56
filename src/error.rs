use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    clients::git::RepositorySyncError,
    services::{checkout_prep::PrepareError, launcher::LaunchError, readiness::ReadinessError},
};

/// Errors raised while setting up a new game.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Cloning or resetting the checkout failed.
    #[error("repository sync failed")]
    RepositorySync(#[from] RepositorySyncError),
    /// Rewriting checkout files failed.
    #[error("checkout preparation failed")]
    Prepare(#[from] PrepareError),
    /// The game (or the IDE running it) could not be started.
    #[error("game launch failed")]
    Launch(#[from] LaunchError),
    /// The game never became healthy.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    /// Another setup is still in progress.
    #[error("a game setup is already in progress")]
    AlreadyRunning,
    /// The setup task panicked or was aborted before finishing.
    #[error("game setup task did not complete")]
    Interrupted(#[from] tokio::task::JoinError),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A dependency (git remote, game process, IDE) failed.
    #[error("upstream failure: {0}")]
    BadGateway(String),
    /// The game did not answer in time.
    #[error("timed out: {0}")]
    GatewayTimeout(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SetupError> for AppError {
    fn from(err: SetupError) -> Self {
        let message = error_chain(&err);
        match err {
            SetupError::AlreadyRunning => AppError::Conflict(message),
            SetupError::Readiness(ReadinessError::TimedOut { .. }) => {
                AppError::GatewayTimeout(message)
            }
            SetupError::Readiness(ReadinessError::InvalidTransition(_))
            | SetupError::Interrupted(_) => AppError::Internal(message),
            SetupError::RepositorySync(_)
            | SetupError::Prepare(_)
            | SetupError::Launch(_)
            | SetupError::Readiness(ReadinessError::ProcessDied { .. }) => {
                AppError::BadGateway(message)
            }
        }
    }
}

/// Join an error and its sources into one line, e.g. `repository sync failed: git fetch failed`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use super::*;

    fn status_of(err: SetupError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn setup_errors_map_to_gateway_statuses() {
        assert_eq!(
            status_of(SetupError::RepositorySync(RepositorySyncError::NotARepository {
                path: PathBuf::from("/tmp/game"),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SetupError::Launch(LaunchError::EmptyCommand)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SetupError::Readiness(ReadinessError::ProcessDied {
                attempts: 1,
                exit_code: Some(1),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SetupError::Readiness(ReadinessError::TimedOut {
                attempts: 20,
                waited: Duration::from_secs(60),
            })),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(SetupError::AlreadyRunning),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn aborted_setup_task_is_an_internal_error() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let join_err = task.await.unwrap_err();

        assert_eq!(
            status_of(SetupError::from(join_err)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn message_includes_the_cause() {
        let err = SetupError::RepositorySync(RepositorySyncError::NotARepository {
            path: PathBuf::from("/tmp/game"),
        });
        let app: AppError = err.into();
        assert!(app.to_string().contains("repository sync failed: "));
        assert!(app.to_string().contains("/tmp/game"));
    }
}
