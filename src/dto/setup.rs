use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    clients::git::SyncOutcome,
    dto::format_system_time,
    services::setup_service::{SessionSnapshot, SetupReport},
    state::SetupStatus,
};

/// How the checkout was brought up to date.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Fresh shallow clone.
    Cloned,
    /// Existing checkout fetched and hard-reset.
    Reset,
}

impl From<SyncOutcome> for SyncKind {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Cloned => SyncKind::Cloned,
            SyncOutcome::Reset => SyncKind::Reset,
        }
    }
}

/// Result of `POST /games/setup`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetupResponse {
    /// Launch session running the game.
    pub session_id: Uuid,
    /// Game process id, when known.
    pub pid: Option<u32>,
    /// `true` when a running game process was reused instead of spawning a new one.
    pub reused: bool,
    /// How the checkout was synchronised.
    pub sync: SyncKind,
    /// Health checks performed before the game answered.
    pub attempts: u32,
    /// Milliseconds spent waiting for the game.
    pub waited_ms: u64,
    /// Page opened in the browser.
    pub ui_url: String,
}

impl From<SetupReport> for SetupResponse {
    fn from(report: SetupReport) -> Self {
        Self {
            session_id: report.session_id,
            pid: report.pid,
            reused: report.reused,
            sync: report.sync.into(),
            attempts: report.attempts,
            waited_ms: u64::try_from(report.waited.as_millis()).unwrap_or(u64::MAX),
            ui_url: report.ui_url,
        }
    }
}

/// Public view of a launch session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: Uuid,
    /// Process id, when known.
    pub pid: Option<u32>,
    /// Whether the process is still running.
    pub alive: bool,
    /// Exit code once the process is gone.
    pub exit_code: Option<i32>,
    /// Checkout the game runs from.
    pub working_dir: String,
    /// RFC 3339 timestamp.
    pub started_at: String,
}

impl From<SessionSnapshot> for SessionSummary {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            pid: snapshot.pid,
            alive: snapshot.alive,
            exit_code: snapshot.exit_code,
            working_dir: snapshot.working_dir.display().to_string(),
            started_at: format_system_time(snapshot.started_at),
        }
    }
}

/// Result of `GET /games/session`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatusResponse {
    /// Current session, if any.
    pub session: Option<SessionSummary>,
    /// Latest setup progress.
    pub setup: SetupStatus,
}

/// Result of `POST /games/shutdown`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShutdownResponse {
    /// Whether a session existed and was torn down.
    pub stopped: bool,
}
