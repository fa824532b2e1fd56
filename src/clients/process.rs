//! Child process handles that track exit status in the background.

use std::{io, process::Stdio};

use tokio::{
    process::{Child, Command},
    sync::{Mutex, oneshot, watch},
};
use tracing::{info, warn};

/// Observed state of a spawned child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The child has not exited yet.
    Running,
    /// The child exited; `code` is `None` when it was killed by a signal.
    Exited {
        /// Exit code reported by the OS, if any.
        code: Option<i32>,
    },
}

/// Handle to a spawned process whose exit is published through a watch channel.
///
/// A background task owns the [`Child`] and waits on it, so liveness checks never need
/// mutable access. Dropping the handle kills the child.
#[derive(Debug)]
pub struct ProcessHandle {
    label: &'static str,
    pid: Option<u32>,
    exit: watch::Receiver<ExitState>,
    kill: Mutex<Option<oneshot::Sender<()>>>,
}

impl ProcessHandle {
    /// Spawn `command` and start watching it. `label` only shows up in logs.
    pub fn spawn(label: &'static str, mut command: Command) -> io::Result<Self> {
        command.stdin(Stdio::null()).kill_on_drop(true);
        let child = command.spawn()?;
        let pid = child.id();

        let (exit_tx, exit_rx) = watch::channel(ExitState::Running);
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(watch_exit(label, pid, child, exit_tx, kill_rx));

        Ok(Self {
            label,
            pid,
            exit: exit_rx,
            kill: Mutex::new(Some(kill_tx)),
        })
    }

    /// OS process identifier captured at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Label used in log lines.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether the child is still running.
    pub fn is_alive(&self) -> bool {
        matches!(*self.exit.borrow(), ExitState::Running)
    }

    /// Exit code once the child is gone.
    pub fn exit_code(&self) -> Option<i32> {
        match *self.exit.borrow() {
            ExitState::Running => None,
            ExitState::Exited { code } => code,
        }
    }

    /// Wait until the child exits and return its exit code.
    pub async fn wait_for_exit(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        match exit
            .wait_for(|state| matches!(state, ExitState::Exited { .. }))
            .await
        {
            Ok(state) => match *state {
                ExitState::Exited { code } => code,
                ExitState::Running => None,
            },
            // The watcher only drops its sender after publishing the exit.
            Err(_) => None,
        }
    }

    /// Kill the child (if still running) and wait for it to be reaped.
    pub async fn terminate(&self) {
        if let Some(kill) = self.kill.lock().await.take() {
            let _ = kill.send(());
        }
        self.wait_for_exit().await;
    }
}

async fn watch_exit(
    label: &'static str,
    pid: Option<u32>,
    mut child: Child,
    exit_tx: watch::Sender<ExitState>,
    kill_rx: oneshot::Receiver<()>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // Fires on an explicit terminate and when the handle is dropped.
        _ = kill_rx => {
            if let Err(err) = child.start_kill() {
                warn!(label, ?pid, error = %err, "failed to kill process");
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => {
            info!(label, ?pid, code = ?status.code(), "process exited");
            status.code()
        }
        Err(err) => {
            warn!(label, ?pid, error = %err, "failed to wait for process");
            None
        }
    };

    exit_tx.send_replace(ExitState::Exited { code });
}

/// Split a configured command line into a program and its arguments using shell-word rules.
///
/// Returns `None` for unbalanced quotes; an empty line yields `Some` with an empty program.
pub fn parse_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut words = shlex::split(line)?.into_iter();
    let program = words.next().unwrap_or_default();
    Some((program, words.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_line_splits_words() {
        let (program, args) =
            parse_command_line("./mvnw clean quarkus:dev -Dquarkus.http.port=8088").unwrap();
        assert_eq!(program, "./mvnw");
        assert_eq!(args, vec!["clean", "quarkus:dev", "-Dquarkus.http.port=8088"]);

        let (program, args) = parse_command_line("sh -c 'exit 3'").unwrap();
        assert_eq!(program, "sh");
        assert_eq!(args, vec!["-c", "exit 3"]);
    }

    #[test]
    fn parse_command_line_rejects_bad_quotes() {
        assert!(parse_command_line("sh -c 'exit 3").is_none());
        assert_eq!(parse_command_line("   ").unwrap().0, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_is_published() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]);
        let handle = ProcessHandle::spawn("test", command).unwrap();

        assert_eq!(handle.wait_for_exit().await, Some(3));
        assert!(!handle.is_alive());
        assert_eq!(handle.exit_code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_kills_running_child() {
        let mut command = Command::new("sleep");
        command.arg("30");
        let handle = ProcessHandle::spawn("test", command).unwrap();
        assert!(handle.is_alive());
        assert!(handle.pid().is_some());

        handle.terminate().await;
        assert!(!handle.is_alive());

        // Second call is a no-op.
        handle.terminate().await;
    }
}
