//! The demo run itself.
//!
//! [`Harness::run`] walks a fixed sequence:
//!
//! `stack-up -> stack-ready -> deps-installed -> server-started ->
//! server-ready -> client-run -> server-stopped -> done`
//!
//! Setup steps (stack, deps) and the stack wait are fire-and-continue:
//! failures are logged and the sequence proceeds. Once the server has a
//! PID it is always terminated, whatever happens to the readiness wait or
//! the client. The completion message is written once, after termination.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::lock::RunLock;
use crate::readiness::{Readiness, ReadinessSpec};
use crate::runner::{CommandSpec, ProcessRunner, TerminationOutcome};

/// One stage of a harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StackUp,
    StackReady,
    DepsInstalled,
    ServerStarted,
    ServerReady,
    ClientRun,
    ServerStopped,
    StackDown,
    Done,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::StackUp => "stack-up",
            Step::StackReady => "stack-ready",
            Step::DepsInstalled => "deps-installed",
            Step::ServerStarted => "server-started",
            Step::ServerReady => "server-ready",
            Step::ClientRun => "client-run",
            Step::ServerStopped => "server-stopped",
            Step::StackDown => "stack-down",
            Step::Done => "done",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub elapsed: Duration,
}

/// Everything observed during a run, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessReport {
    pub steps: Vec<StepRecord>,
    pub server_pid: Option<u32>,
    /// Exit code of the client; `None` if it did not run or died by signal.
    pub client_exit_code: Option<i32>,
    pub termination: Option<TerminationOutcome>,
    pub cancelled: bool,
}

impl HarnessReport {
    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.status)
    }

    /// The server came up and was stopped again. The client's own exit
    /// status does not count against the run.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.status(Step::ServerReady) == Some(&StepStatus::Ok)
            && self.status(Step::ServerStopped) == Some(&StepStatus::Ok)
    }

    fn record(&mut self, step: Step, status: StepStatus, started: Instant) {
        let elapsed = started.elapsed();
        match &status {
            StepStatus::Ok => {
                tracing::info!(step = %step, elapsed_ms = elapsed.as_millis() as u64, "Step complete");
            }
            StepStatus::Failed(reason) => {
                tracing::warn!(step = %step, reason = %reason, "Step failed");
            }
            StepStatus::Skipped(reason) => {
                tracing::info!(step = %step, reason = %reason, "Step skipped");
            }
        }
        self.steps.push(StepRecord {
            step,
            status,
            elapsed,
        });
    }

    fn skip(&mut self, steps: &[Step], reason: &str) {
        for step in steps {
            self.record(*step, StepStatus::Skipped(reason.to_string()), Instant::now());
        }
    }
}

/// Sequential, non-reentrant demo harness.
pub struct Harness<R, P, W> {
    config: HarnessConfig,
    runner: R,
    readiness: P,
    out: W,
    cancel: CancellationToken,
}

impl<R, P, W> Harness<R, P, W>
where
    R: ProcessRunner,
    P: Readiness,
    W: Write,
{
    pub fn new(config: HarnessConfig, runner: R, readiness: P, out: W) -> Self {
        Self {
            config,
            runner,
            readiness,
            out,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the run early. The server is still stopped if it
    /// was started.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the full sequence.
    ///
    /// Only a lock conflict or lock I/O error is returned as `Err`; every
    /// other failure is recorded in the report.
    pub async fn run(&mut self) -> Result<HarnessReport, HarnessError> {
        let _lock = RunLock::acquire(&self.config.lock_path)?;
        let mut report = HarnessReport::default();

        tracing::info!("Starting demo run");

        let stack_up = self.config.stack_up.clone();
        self.setup_step(Step::StackUp, &stack_up, &mut report).await;

        let stack_readiness = self.config.stack_readiness.clone();
        if !self
            .wait_step(Step::StackReady, "stack", &stack_readiness, &mut report)
            .await
        {
            report.cancelled = true;
            report.skip(
                &[
                    Step::DepsInstalled,
                    Step::ServerStarted,
                    Step::ServerReady,
                    Step::ClientRun,
                    Step::ServerStopped,
                ],
                "cancelled",
            );
            self.stack_down(&mut report).await;
            return Ok(report);
        }

        let deps = self.config.deps.clone();
        self.setup_step(Step::DepsInstalled, &deps, &mut report).await;

        // Setup commands are not raced against the token; a long dependency
        // build may have been interrupted.
        if self.cancel.is_cancelled() {
            report.cancelled = true;
            report.skip(
                &[
                    Step::ServerStarted,
                    Step::ServerReady,
                    Step::ClientRun,
                    Step::ServerStopped,
                ],
                "cancelled",
            );
            self.stack_down(&mut report).await;
            return Ok(report);
        }

        let started = Instant::now();
        let server = self.config.server.clone();
        let pid = match self.runner.spawn(&server) {
            Ok(pid) => {
                tracing::info!(pid, command = %server, "Server launched");
                report.server_pid = Some(pid);
                report.record(Step::ServerStarted, StepStatus::Ok, started);
                pid
            }
            Err(e) => {
                tracing::error!(error = %e, "Server launch failed");
                report.record(Step::ServerStarted, StepStatus::Failed(e.to_string()), started);
                report.skip(
                    &[Step::ServerReady, Step::ClientRun, Step::ServerStopped],
                    "server not started",
                );
                self.stack_down(&mut report).await;
                return Ok(report);
            }
        };

        let server_readiness = self.config.server_readiness.clone();
        let completed = self
            .wait_step(Step::ServerReady, "server", &server_readiness, &mut report)
            .await;

        if !completed {
            report.cancelled = true;
            report.skip(&[Step::ClientRun], "cancelled");
        } else if report.status(Step::ServerReady) != Some(&StepStatus::Ok) {
            report.skip(&[Step::ClientRun], "server not ready");
        } else {
            self.client_step(&mut report).await;
        }

        let started = Instant::now();
        match self.runner.terminate(pid, self.config.termination_grace).await {
            Ok(outcome) => {
                tracing::info!(pid, outcome = %outcome, "Server stopped");
                report.termination = Some(outcome);
                report.record(Step::ServerStopped, StepStatus::Ok, started);
            }
            Err(e) => {
                report.record(Step::ServerStopped, StepStatus::Failed(e.to_string()), started);
            }
        }

        self.stack_down(&mut report).await;

        let started = Instant::now();
        if let Err(e) = writeln!(self.out, "{}", self.config.completion_message)
            .and_then(|()| self.out.flush())
        {
            tracing::warn!(error = %e, "Failed to write completion message");
        }
        report.record(Step::Done, StepStatus::Ok, started);

        Ok(report)
    }

    /// Run a fire-and-continue setup command.
    async fn setup_step(&mut self, step: Step, command: &CommandSpec, report: &mut HarnessReport) {
        let started = Instant::now();
        tracing::info!(step = %step, command = %command, "Running");

        let status = match self.runner.run(command).await {
            Ok(Some(0)) => StepStatus::Ok,
            Ok(Some(code)) => StepStatus::Failed(format!("'{command}' exited with code {code}")),
            Ok(None) => StepStatus::Failed(format!("'{command}' was terminated by a signal")),
            Err(e) => StepStatus::Failed(e.to_string()),
        };
        report.record(step, status, started);
    }

    /// Wait on `spec`, recording the outcome. Returns `false` only when the
    /// run was cancelled during the wait.
    async fn wait_step(
        &mut self,
        step: Step,
        target: &str,
        spec: &ReadinessSpec,
        report: &mut HarnessReport,
    ) -> bool {
        let started = Instant::now();
        tracing::info!(step = %step, probe = %spec.probe, "Waiting for {target}");

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.readiness.wait_until_ready(target, spec) => Some(result),
        };

        match result {
            None => {
                report.record(step, StepStatus::Skipped("cancelled".into()), started);
                false
            }
            Some(Ok(_)) => {
                report.record(step, StepStatus::Ok, started);
                true
            }
            Some(Err(e)) => {
                report.record(step, StepStatus::Failed(e.to_string()), started);
                true
            }
        }
    }

    /// Run the client to completion. Its exit status is recorded, never
    /// treated as a harness failure.
    async fn client_step(&mut self, report: &mut HarnessReport) {
        let started = Instant::now();
        let client = self.config.client.clone();
        tracing::info!(command = %client, "Running client");

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.runner.run(&client) => Some(result),
        };

        let status = match result {
            None => {
                report.cancelled = true;
                StepStatus::Skipped("cancelled".into())
            }
            Some(Ok(code)) => {
                report.client_exit_code = code;
                match code {
                    Some(0) => StepStatus::Ok,
                    Some(code) => StepStatus::Failed(format!("client exited with code {code}")),
                    None => StepStatus::Failed("client was terminated by a signal".into()),
                }
            }
            Some(Err(e)) => StepStatus::Failed(e.to_string()),
        };
        report.record(Step::ClientRun, status, started);
    }

    async fn stack_down(&mut self, report: &mut HarnessReport) {
        if let Some(command) = self.config.stack_down.clone() {
            self.setup_step(Step::StackDown, &command, report).await;
        }
    }
}
