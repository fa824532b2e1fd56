/// Readiness gate state machine and policy.
pub mod readiness;
/// Launch sessions and the single-session slot.
pub mod session;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, watch};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    clients::health_probe::HealthCheck, config::AppConfig, services::launcher::GameLauncher,
};

use self::session::SessionSlot;

/// Handle to the application state shared across handlers and tasks.
pub type SharedState = Arc<AppState>;

/// Progress of the "set up a new game" flow, as shown to the waiting UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SetupStatus {
    /// Nothing has been requested yet.
    Idle,
    /// Cloning or resetting the checkout.
    Syncing,
    /// Rewriting checkout files before launch.
    Preparing,
    /// Starting the game process or asking the IDE to.
    Launching,
    /// Polling the health endpoint.
    WaitingForHealth {
        /// 1-based health check number.
        attempt: u32,
    },
    /// The game answered healthy and the browser was opened.
    Ready {
        /// Session running the game.
        session_id: Uuid,
    },
    /// The last setup failed.
    Failed {
        /// Error chain of the failure.
        reason: String,
    },
}

/// Central application state shared by every request handler.
pub struct AppState {
    config: AppConfig,
    sessions: SessionSlot,
    launcher: Arc<dyn GameLauncher>,
    probe: Arc<dyn HealthCheck>,
    setup_status: watch::Sender<SetupStatus>,
    setup_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        launcher: Arc<dyn GameLauncher>,
        probe: Arc<dyn HealthCheck>,
    ) -> SharedState {
        let (setup_status, _rx) = watch::channel(SetupStatus::Idle);
        Arc::new(Self {
            config,
            sessions: SessionSlot::default(),
            launcher,
            probe,
            setup_status,
            setup_gate: Mutex::new(()),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Slot holding the current launch session.
    pub fn sessions(&self) -> &SessionSlot {
        &self.sessions
    }

    /// Strategy used to start the game.
    pub fn launcher(&self) -> &Arc<dyn GameLauncher> {
        &self.launcher
    }

    /// Health check used by the readiness gate.
    pub fn probe(&self) -> &Arc<dyn HealthCheck> {
        &self.probe
    }

    /// Latest setup status.
    pub fn setup_status(&self) -> SetupStatus {
        self.setup_status.borrow().clone()
    }

    /// Subscribe to setup status updates.
    pub fn setup_watcher(&self) -> watch::Receiver<SetupStatus> {
        self.setup_status.subscribe()
    }

    /// Replace the setup status, notifying subscribers when it changed.
    pub fn publish_status(&self, status: SetupStatus) {
        self.setup_status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Claim the single setup slot; `None` when another setup is already running.
    pub fn try_begin_setup(&self) -> Option<MutexGuard<'_, ()>> {
        self.setup_gate.try_lock().ok()
    }
}
