//! Launch sessions and the slot that keeps at most one of them.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::{clients::process::ProcessHandle, state::readiness::Liveness};

/// The externally launched game process plus everything opened on its behalf.
pub struct LaunchSession {
    id: Uuid,
    working_dir: PathBuf,
    process: ProcessHandle,
    external: Mutex<Vec<ProcessHandle>>,
    started_at: SystemTime,
}

impl LaunchSession {
    /// Wrap a freshly spawned `process` running from `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, process: ProcessHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            working_dir: working_dir.into(),
            process,
            external: Mutex::new(Vec::new()),
            started_at: SystemTime::now(),
        }
    }

    /// Identifier of this launch.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Checkout the game was launched from.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The launched game or IDE process.
    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    /// When the launch happened.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Keep track of an auxiliary process (browser, ...) so shutdown can destroy it.
    ///
    /// Handles that already exited are dropped first, so repeated setups do not pile them up.
    pub async fn track_external(&self, handle: ProcessHandle) {
        let mut external = self.external.lock().await;
        external.retain(ProcessHandle::is_alive);
        external.push(handle);
    }

    /// Number of auxiliary processes currently tracked.
    pub async fn external_count(&self) -> usize {
        self.external.lock().await.len()
    }

    /// Destroy the game process and every tracked external process.
    pub async fn shutdown(&self) {
        info!(session = %self.id, pid = ?self.process.pid(), "shutting down launch session");
        self.process.terminate().await;

        let external = std::mem::take(&mut *self.external.lock().await);
        for handle in external {
            handle.terminate().await;
        }
    }
}

impl Liveness for LaunchSession {
    fn is_alive(&self) -> bool {
        self.process.is_alive()
    }

    fn exit_code(&self) -> Option<i32> {
        self.process.exit_code()
    }
}

/// Session returned by [`SessionSlot::get_or_create`].
pub struct Acquired {
    /// The live session.
    pub session: Arc<LaunchSession>,
    /// `true` when an already running session was handed back.
    pub reused: bool,
}

/// Process-wide slot holding the current launch session.
#[derive(Default)]
pub struct SessionSlot {
    current: Mutex<Option<Arc<LaunchSession>>>,
}

impl SessionSlot {
    /// Return the live session, or build one with `create` when there is none or it died.
    ///
    /// The lock is held across the liveness check, `create` and the store, so concurrent
    /// callers never spawn two processes.
    pub async fn get_or_create<F, E>(&self, create: F) -> Result<Acquired, E>
    where
        F: FnOnce() -> Result<LaunchSession, E>,
    {
        let mut guard = self.current.lock().await;

        if let Some(session) = guard.as_ref().filter(|session| session.is_alive()) {
            return Ok(Acquired {
                session: Arc::clone(session),
                reused: true,
            });
        }

        if let Some(dead) = guard.take() {
            info!(
                session = %dead.id(),
                code = ?dead.exit_code(),
                "previous game process is gone; replacing launch session"
            );
        }

        let session = Arc::new(create()?);
        *guard = Some(Arc::clone(&session));
        Ok(Acquired {
            session,
            reused: false,
        })
    }

    /// Current session, alive or not.
    pub async fn current(&self) -> Option<Arc<LaunchSession>> {
        self.current.lock().await.clone()
    }

    /// Remove the current session from the slot.
    pub async fn take(&self) -> Option<Arc<LaunchSession>> {
        self.current.lock().await.take()
    }
}
