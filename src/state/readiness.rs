//! Readiness gate state machine and polling policy for a freshly launched game.
//!
//! ```text
//! NotStarted -> Starting -> Polling(n) -> Polling(n+1) ... -> Ready
//!                                                         -> TimedOut
//!                                                         -> Failed
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::config::ReadinessOverrides;

/// Anything whose "is the process still running" question can be answered cheaply.
pub trait Liveness: Send + Sync {
    /// Whether the underlying process (or external handle) is still running.
    fn is_alive(&self) -> bool;
    /// Exit code once the process is gone, if the OS reported one.
    fn exit_code(&self) -> Option<i32>;
}

/// Timing knobs for a single readiness gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Wait before the first health check.
    pub initial_delay: Duration,
    /// Wait between two health checks.
    pub poll_interval: Duration,
    /// Total budget, measured from the start of the gate.
    pub max_wait: Duration,
}

impl ReadinessPolicy {
    /// Default policy for a locally spawned dev-mode process.
    pub const fn for_process() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(60),
        }
    }

    /// Default policy when the IDE starts the game.
    pub const fn for_ide() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(60),
        }
    }

    /// Apply configured overrides on top of this policy.
    pub fn with_overrides(self, overrides: &ReadinessOverrides) -> Self {
        Self {
            initial_delay: overrides
                .poll_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.initial_delay),
            poll_interval: overrides
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(self.poll_interval),
            max_wait: overrides
                .max_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(self.max_wait),
        }
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::for_process()
    }
}

/// Phase of a readiness gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Gate created, nothing scheduled yet.
    NotStarted,
    /// Waiting out the initial delay.
    Starting,
    /// Health polls in progress.
    Polling {
        /// Polls already performed.
        attempt: u32,
    },
    /// The game answered healthy.
    Ready,
    /// The budget ran out.
    TimedOut,
    /// The process died first.
    Failed,
}

impl GatePhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::TimedOut | Self::Failed)
    }
}

/// Result of a single health poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the process was alive when polled.
    pub alive: bool,
    /// Whether the health endpoint answered OK.
    pub healthy: bool,
}

/// A transition was requested from a phase that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} while the readiness gate is {from:?}")]
pub struct InvalidGateTransition {
    /// Phase the gate was in.
    pub from: GatePhase,
    /// Requested action.
    pub action: &'static str,
}

/// Pure state machine; timing and I/O live in `services::readiness`.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    phase: GatePhase,
    attempts: u32,
    max_wait: Duration,
}

impl ReadinessGate {
    /// New gate in [`GatePhase::NotStarted`].
    pub fn new(max_wait: Duration) -> Self {
        Self {
            phase: GatePhase::NotStarted,
            attempts: 0,
            max_wait,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Number of polls recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The launch command has been issued.
    pub fn start(&mut self) -> Result<GatePhase, InvalidGateTransition> {
        match self.phase {
            GatePhase::NotStarted => {
                self.phase = GatePhase::Starting;
                Ok(self.phase)
            }
            from => Err(InvalidGateTransition {
                from,
                action: "start",
            }),
        }
    }

    /// The process handle exists and the initial delay has elapsed.
    pub fn begin_polling(&mut self) -> Result<GatePhase, InvalidGateTransition> {
        match self.phase {
            GatePhase::Starting => {
                self.phase = GatePhase::Polling { attempt: 0 };
                Ok(self.phase)
            }
            from => Err(InvalidGateTransition {
                from,
                action: "begin polling",
            }),
        }
    }

    /// Record one poll taken `elapsed` after the gate started and return the next phase.
    ///
    /// A dead process wins over everything else, then a healthy answer, then the deadline.
    pub fn record_poll(
        &mut self,
        outcome: PollOutcome,
        elapsed: Duration,
    ) -> Result<GatePhase, InvalidGateTransition> {
        let GatePhase::Polling { attempt } = self.phase else {
            return Err(InvalidGateTransition {
                from: self.phase,
                action: "record a poll",
            });
        };

        self.attempts = attempt + 1;
        self.phase = if !outcome.alive {
            GatePhase::Failed
        } else if outcome.healthy {
            GatePhase::Ready
        } else if elapsed >= self.max_wait {
            GatePhase::TimedOut
        } else {
            GatePhase::Polling {
                attempt: self.attempts,
            }
        };

        Ok(self.phase)
    }
}
