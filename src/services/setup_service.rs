//! The "set up a new game" flow and session teardown.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clients::{
        browser::open_browser,
        git::{GitCli, SyncOutcome},
    },
    error::{SetupError, error_chain},
    services::{checkout_prep::prepare_checkout, launcher::LaunchError, readiness::await_ready},
    state::{
        SetupStatus, SharedState,
        readiness::{GatePhase, Liveness},
        session::LaunchSession,
    },
};

/// What a successful setup produced.
#[derive(Debug, Clone)]
pub struct SetupReport {
    /// Identifier of the launch session now running the game.
    pub session_id: Uuid,
    /// PID of the launched process, when the OS reported one.
    pub pid: Option<u32>,
    /// Whether an already running process was reused.
    pub reused: bool,
    /// How the checkout was synchronised.
    pub sync: SyncOutcome,
    /// Health checks needed before the game answered.
    pub attempts: u32,
    /// Time spent waiting for the game to become healthy.
    pub waited: Duration,
    /// Page opened in the browser.
    pub ui_url: String,
}

/// Snapshot of the current launch session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Process id, when known.
    pub pid: Option<u32>,
    /// Whether the session process is running.
    pub alive: bool,
    /// Exit code once the process is gone.
    pub exit_code: Option<i32>,
    /// Checkout the game runs from.
    pub working_dir: PathBuf,
    /// When the session was created.
    pub started_at: SystemTime,
}

impl SessionSnapshot {
    fn of(session: &LaunchSession) -> Self {
        Self {
            id: session.id(),
            pid: session.process().pid(),
            alive: session.is_alive(),
            exit_code: session.exit_code(),
            working_dir: session.working_dir().to_path_buf(),
            started_at: session.started_at(),
        }
    }
}

/// Sync the checkout, prepare it, launch the game, wait until it is healthy and open the browser.
///
/// Only one setup runs at a time; a concurrent call fails with [`SetupError::AlreadyRunning`].
/// The setup runs on its own task, so it completes (and publishes its final status) even when
/// the caller stops waiting for it.
pub async fn set_up_new_game(state: &SharedState) -> Result<SetupReport, SetupError> {
    let task_state = Arc::clone(state);
    let task = tokio::spawn(async move { guarded_setup(&task_state).await });

    match task.await {
        Ok(result) => result,
        Err(join) => {
            let err = SetupError::from(join);
            let reason = error_chain(&err);
            error!(error = %reason, "game setup task did not complete");
            state.publish_status(SetupStatus::Failed { reason });
            Err(err)
        }
    }
}

async fn guarded_setup(state: &SharedState) -> Result<SetupReport, SetupError> {
    let Some(_guard) = state.try_begin_setup() else {
        warn!("game setup requested while another one is running");
        return Err(SetupError::AlreadyRunning);
    };

    match run_setup(state).await {
        Ok(report) => {
            state.publish_status(SetupStatus::Ready {
                session_id: report.session_id,
            });
            Ok(report)
        }
        Err(err) => {
            let reason = error_chain(&err);
            error!(error = %reason, "game setup failed");
            state.publish_status(SetupStatus::Failed { reason });
            Err(err)
        }
    }
}

async fn run_setup(state: &SharedState) -> Result<SetupReport, SetupError> {
    let game = &state.config().game;
    let checkout_dir = absolute(game.checkout_dir());
    let root_dir = absolute(game.root_checkout_dir.clone());

    state.publish_status(SetupStatus::Syncing);
    let sync = GitCli::new(game.git_binary.as_str())
        .ensure_checkout(&root_dir, &checkout_dir, &game.repo_url(), &game.branch)
        .await?;

    state.publish_status(SetupStatus::Preparing);
    prepare_checkout(&checkout_dir, &game.prepare.files, &game.prepare.markers).await?;

    state.publish_status(SetupStatus::Launching);
    let launcher = state.launcher();
    let existing = state.sessions().current().await.map(|session| session.id());
    let session = launcher.launch(state.sessions(), &checkout_dir).await?;
    let reused = existing == Some(session.id());
    info!(
        launcher = launcher.name(),
        session = %session.id(),
        reused,
        "game launched; waiting for it to become healthy"
    );

    let policy = launcher.readiness_policy();
    let liveness = launcher.liveness(Arc::clone(&session));
    let ready = await_ready(&policy, liveness.as_ref(), state.probe().as_ref(), |phase| {
        if let GatePhase::Polling { attempt } = phase {
            state.publish_status(SetupStatus::WaitingForHealth { attempt });
        }
    })
    .await?;

    let ui_url = launcher.ui_url();
    let browser = open_browser(&game.browser_command, &ui_url).map_err(|source| {
        LaunchError::Browser {
            url: ui_url.clone(),
            source,
        }
    })?;
    session.track_external(browser).await;

    Ok(SetupReport {
        session_id: session.id(),
        pid: session.process().pid(),
        reused,
        sync,
        attempts: ready.attempts,
        waited: ready.waited,
        ui_url,
    })
}

/// Tear down the current launch session. Returns `false` when nothing was running.
pub async fn shutdown_game(state: &SharedState) -> bool {
    let Some(session) = state.sessions().take().await else {
        return false;
    };

    session.shutdown().await;
    state.publish_status(SetupStatus::Idle);
    true
}

/// Current session (if any) and the latest setup status.
pub async fn session_status(state: &SharedState) -> (Option<SessionSnapshot>, SetupStatus) {
    let session = state
        .sessions()
        .current()
        .await
        .map(|session| SessionSnapshot::of(&session));
    (session, state.setup_status())
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
