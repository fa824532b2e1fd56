//! Strategies that start the game from a checkout: a direct child process or an IDE run configuration.

use std::{io, path::Path, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::{
    clients::{
        ide_tools::{IdeTools, McpToolClient, ToolError},
        process::{ProcessHandle, parse_command_line},
    },
    config::{GameConfig, LaunchMode},
    state::{
        readiness::{Liveness, ReadinessPolicy},
        session::{LaunchSession, SessionSlot},
    },
};

/// Failures raised while starting the game.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The configured command line has no program.
    #[error("startup command is empty")]
    EmptyCommand,
    /// The configured command line has unbalanced quotes.
    #[error("startup command `{command}` could not be parsed")]
    InvalidCommand {
        /// The command line as configured.
        command: String,
    },
    /// Spawning the process failed.
    #[error("failed to start `{command}`")]
    Spawn {
        /// The command line as configured.
        command: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The IDE refused or failed the run configuration.
    #[error("IDE tool invocation failed")]
    Tool(#[from] ToolError),
    /// The browser could not be opened once the game was ready.
    #[error("failed to open browser at `{url}`")]
    Browser {
        /// URL that was to be opened.
        url: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Strategy that starts the game from a checkout and hands back its launch session.
pub trait GameLauncher: Send + Sync {
    /// Short name used in logs and status payloads.
    fn name(&self) -> &'static str;

    /// Timing used by the readiness gate for games started this way.
    fn readiness_policy(&self) -> ReadinessPolicy;

    /// URL opened in the browser once the game is healthy.
    fn ui_url(&self) -> String;

    /// What the readiness gate watches to detect a dead game. Defaults to the session process.
    fn liveness(&self, session: Arc<LaunchSession>) -> Arc<dyn Liveness> {
        session
    }

    /// Start (or reuse) the game process for `checkout_dir`, storing it in `slot`.
    fn launch<'a>(
        &'a self,
        slot: &'a SessionSlot,
        checkout_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Arc<LaunchSession>, LaunchError>>;
}

/// Build the launcher selected by `config.launch_mode`.
pub fn from_config(config: &GameConfig) -> Result<Arc<dyn GameLauncher>, LaunchError> {
    let launcher: Arc<dyn GameLauncher> = match config.launch_mode {
        LaunchMode::Process => Arc::new(LocalProcessLauncher {
            command_line: config.app_startup_command(),
            ui_url: format!("{}/workspace", config.app_dev_ui_url().trim_end_matches('/')),
            policy: ReadinessPolicy::for_process().with_overrides(&config.readiness),
        }),
        LaunchMode::Ide => {
            let tools = McpToolClient::new(
                config.ide.mcp_url.clone(),
                Duration::from_millis(config.ide.tool_timeout_ms),
            )?;
            Arc::new(IdeLauncher {
                ide_command: config.ide.command.clone(),
                run_configuration: config.ide.run_configuration.clone(),
                tools: Arc::new(tools),
                ui_url: config.app_dev_ui_url(),
                policy: ReadinessPolicy::for_ide().with_overrides(&config.readiness),
            })
        }
    };

    info!(launcher = launcher.name(), "game launcher configured");
    Ok(launcher)
}

/// Runs the configured startup command as a direct child process.
pub struct LocalProcessLauncher {
    /// Shell-style command line, e.g. `./mvnw quarkus:dev`.
    pub command_line: String,
    /// Page opened once the game is healthy.
    pub ui_url: String,
    /// Readiness timing for this launcher.
    pub policy: ReadinessPolicy,
}

impl GameLauncher for LocalProcessLauncher {
    fn name(&self) -> &'static str {
        "process"
    }

    fn readiness_policy(&self) -> ReadinessPolicy {
        self.policy
    }

    fn ui_url(&self) -> String {
        self.ui_url.clone()
    }

    fn launch<'a>(
        &'a self,
        slot: &'a SessionSlot,
        checkout_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Arc<LaunchSession>, LaunchError>> {
        Box::pin(async move {
            let acquired = slot
                .get_or_create(|| {
                    let handle = spawn_command_line("dev mode", &self.command_line, checkout_dir, &[])?;
                    info!(pid = ?handle.pid(), dir = %checkout_dir.display(), "started game process");
                    Ok::<_, LaunchError>(LaunchSession::new(checkout_dir, handle))
                })
                .await?;

            if acquired.reused {
                info!(session = %acquired.session.id(), "game process already running; reusing it");
            }
            Ok(acquired.session)
        })
    }
}

/// Opens the checkout in an IDE and asks it to execute a run configuration.
pub struct IdeLauncher {
    /// IDE executable, given the checkout path as its only argument.
    pub ide_command: String,
    /// Name of the run configuration to execute.
    pub run_configuration: String,
    /// Tool-invocation channel to the running IDE.
    pub tools: Arc<dyn IdeTools>,
    /// Page opened once the game is healthy.
    pub ui_url: String,
    /// Readiness timing for this launcher.
    pub policy: ReadinessPolicy,
}

impl GameLauncher for IdeLauncher {
    fn name(&self) -> &'static str {
        "ide"
    }

    fn readiness_policy(&self) -> ReadinessPolicy {
        self.policy
    }

    fn ui_url(&self) -> String {
        self.ui_url.clone()
    }

    /// The IDE command usually hands the project to a running IDE and exits, and the game
    /// runs inside the IDE. Only the health endpoint tells whether it came up.
    fn liveness(&self, _session: Arc<LaunchSession>) -> Arc<dyn Liveness> {
        Arc::new(RunsInIde)
    }

    fn launch<'a>(
        &'a self,
        slot: &'a SessionSlot,
        checkout_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Arc<LaunchSession>, LaunchError>> {
        Box::pin(async move {
            info!(dir = %checkout_dir.display(), "opening new game in IDE");
            let project = checkout_dir.display().to_string();
            let acquired = slot
                .get_or_create(|| {
                    let handle =
                        spawn_command_line("ide", &self.ide_command, checkout_dir, &[project.as_str()])?;
                    info!(pid = ?handle.pid(), "started IDE process");
                    Ok::<_, LaunchError>(LaunchSession::new(checkout_dir, handle))
                })
                .await?;

            self.tools
                .execute_run_configuration(&self.run_configuration, checkout_dir)
                .await?;

            info!(
                session = %acquired.session.id(),
                run_configuration = %self.run_configuration,
                "requested run configuration from IDE"
            );
            Ok(acquired.session)
        })
    }
}

/// Liveness of a game owned by the IDE; never reported dead.
struct RunsInIde;

impl Liveness for RunsInIde {
    fn is_alive(&self) -> bool {
        true
    }

    fn exit_code(&self) -> Option<i32> {
        None
    }
}

fn spawn_command_line(
    label: &'static str,
    command_line: &str,
    working_dir: &Path,
    extra_args: &[&str],
) -> Result<ProcessHandle, LaunchError> {
    let (program, args) =
        parse_command_line(command_line).ok_or_else(|| LaunchError::InvalidCommand {
            command: command_line.to_string(),
        })?;
    if program.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }

    let mut command = Command::new(&program);
    command.args(args).args(extra_args).current_dir(working_dir);

    ProcessHandle::spawn(label, command).map_err(|source| LaunchError::Spawn {
        command: command_line.to_string(),
        source,
    })
}
