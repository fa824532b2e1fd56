//! Drives the readiness gate: waits, polls the health endpoint and watches the process.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::{
    clients::health_probe::HealthCheck,
    state::readiness::{
        GatePhase, InvalidGateTransition, Liveness, PollOutcome, ReadinessGate, ReadinessPolicy,
    },
};

const HTTP_OK: u16 = 200;

/// Terminal failures of the readiness gate.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// The process stayed up but never answered healthy within the budget.
    #[error("game never became healthy: {attempts} health checks over {waited:?}")]
    TimedOut {
        /// Health checks performed.
        attempts: u32,
        /// Time spent waiting.
        waited: Duration,
    },
    /// The process exited before it became healthy.
    #[error("game process exited before becoming healthy (exit code {exit_code:?})")]
    ProcessDied {
        /// Health checks performed before the exit was noticed.
        attempts: u32,
        /// Exit code, if the OS reported one.
        exit_code: Option<i32>,
    },
    /// Internal sequencing bug in the gate driver.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidGateTransition),
}

/// Summary of a successful gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
    /// Health checks performed, including the successful one.
    pub attempts: u32,
    /// Time spent from gate start until the healthy answer.
    pub waited: Duration,
}

/// Block until `process` answers healthy through `probe`, it dies, or the budget runs out.
///
/// Transport errors from the probe count as "not ready yet". A dead process ends the gate
/// at the next poll without waiting out the budget. `on_phase` sees every phase change.
pub async fn await_ready(
    policy: &ReadinessPolicy,
    process: &dyn Liveness,
    probe: &dyn HealthCheck,
    mut on_phase: impl FnMut(GatePhase) + Send,
) -> Result<ReadyReport, ReadinessError> {
    let mut gate = ReadinessGate::new(policy.max_wait);
    let started = Instant::now();

    on_phase(gate.start()?);
    sleep(policy.initial_delay).await;
    on_phase(gate.begin_polling()?);

    loop {
        let alive = process.is_alive();
        let healthy = alive && probe_is_healthy(probe, gate.attempts() + 1).await;
        let elapsed = started.elapsed();

        let phase = gate.record_poll(PollOutcome { alive, healthy }, elapsed)?;
        on_phase(phase);

        match phase {
            GatePhase::Ready => {
                info!(attempts = gate.attempts(), waited = ?elapsed, "game is up");
                return Ok(ReadyReport {
                    attempts: gate.attempts(),
                    waited: elapsed,
                });
            }
            GatePhase::Failed => {
                let exit_code = process.exit_code();
                warn!(attempts = gate.attempts(), ?exit_code, "game process died while starting");
                return Err(ReadinessError::ProcessDied {
                    attempts: gate.attempts(),
                    exit_code,
                });
            }
            GatePhase::TimedOut => {
                warn!(attempts = gate.attempts(), waited = ?elapsed, "game did not become healthy in time");
                return Err(ReadinessError::TimedOut {
                    attempts: gate.attempts(),
                    waited: elapsed,
                });
            }
            _ => {
                let remaining = policy.max_wait.saturating_sub(elapsed);
                sleep(policy.poll_interval.min(remaining)).await;
            }
        }
    }
}

async fn probe_is_healthy(probe: &dyn HealthCheck, attempt: u32) -> bool {
    info!(attempt, "checking to see if game is up");
    match probe.check().await {
        Ok(HTTP_OK) => true,
        Ok(status) => {
            debug!(attempt, status, "game not ready yet");
            false
        }
        Err(err) => {
            debug!(attempt, error = %err, "health probe failed; treating as not ready");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::clients::health_probe::ProbeError;

    struct FakeProcess {
        alive: AtomicBool,
    }

    impl FakeProcess {
        fn alive() -> Self {
            Self {
                alive: AtomicBool::new(true),
            }
        }
    }

    impl Liveness for FakeProcess {
        fn is_alive(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        fn exit_code(&self) -> Option<i32> {
            (!self.is_alive()).then_some(1)
        }
    }

    /// Answers 503 until `healthy_after` calls, then 200; `None` means transport errors.
    struct FakeProbe {
        calls: Arc<AtomicU32>,
        healthy_after: Option<u32>,
    }

    impl FakeProbe {
        fn new(healthy_after: Option<u32>) -> Self {
            Self {
                calls: Arc::new(AtomicU32::new(0)),
                healthy_after,
            }
        }
    }

    impl HealthCheck for FakeProbe {
        fn check(&self) -> BoxFuture<'static, Result<u16, ProbeError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let healthy_after = self.healthy_after;
            Box::pin(async move {
                match healthy_after {
                    Some(after) if call >= after => Ok(200),
                    Some(_) => Ok(503),
                    None => {
                        let source = reqwest::Client::new()
                            .get("http://[::1")
                            .build()
                            .unwrap_err();
                        Err(ProbeError::Request {
                            url: "http://localhost/q/health".into(),
                            source,
                        })
                    }
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_ready_once_probe_answers_ok() {
        let process = FakeProcess::alive();
        let probe = FakeProbe::new(Some(3));
        let phases = Mutex::new(Vec::new());

        let report = await_ready(&ReadinessPolicy::for_process(), &process, &probe, |phase| {
            phases.lock().unwrap().push(phase)
        })
        .await
        .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.waited, Duration::from_secs(9));
        assert_eq!(
            *phases.lock().unwrap(),
            vec![
                GatePhase::Starting,
                GatePhase::Polling { attempt: 0 },
                GatePhase::Polling { attempt: 1 },
                GatePhase::Polling { attempt: 2 },
                GatePhase::Ready,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_about_twenty_polls() {
        let process = FakeProcess::alive();
        let probe = FakeProbe::new(None);

        let err = await_ready(&ReadinessPolicy::for_process(), &process, &probe, |_| {})
            .await
            .unwrap_err();

        match err {
            ReadinessError::TimedOut { attempts, waited } => {
                assert_eq!(attempts, 20);
                assert_eq!(waited, Duration::from_secs(60));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_process_fails_without_waiting_out_the_budget() {
        let process = FakeProcess::alive();
        process.alive.store(false, Ordering::SeqCst);
        let probe = FakeProbe::new(Some(1));
        let started = Instant::now();

        let err = await_ready(&ReadinessPolicy::for_process(), &process, &probe, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReadinessError::ProcessDied {
                attempts: 1,
                exit_code: Some(1)
            }
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        // A dead process is never probed.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn process_dying_mid_poll_stops_the_gate() {
        let process = Arc::new(FakeProcess::alive());
        let probe = FakeProbe::new(None);

        let watcher = Arc::clone(&process);
        let killer = tokio::spawn(async move {
            sleep(Duration::from_secs(10)).await;
            watcher.alive.store(false, Ordering::SeqCst);
        });

        let err = await_ready(&ReadinessPolicy::for_process(), process.as_ref(), &probe, |_| {})
            .await
            .unwrap_err();
        killer.await.unwrap();

        match err {
            ReadinessError::ProcessDied { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_answer_on_the_deadline_still_counts() {
        let process = FakeProcess::alive();
        let probe = FakeProbe::new(Some(20));

        let report = await_ready(&ReadinessPolicy::for_process(), &process, &probe, |_| {})
            .await
            .unwrap();

        assert_eq!(report.attempts, 20);
    }
}
