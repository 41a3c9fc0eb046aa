//! Process execution for the harness steps.
//!
//! [`ProcessRunner`] is the seam between the step sequence and the OS:
//! [`SystemRunner`] drives real processes through [`tokio::process`], tests
//! substitute a recording fake.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::error::HarnessError;

/// Polling interval while waiting for a signalled process that is not our child.
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A command line: program plus arguments, run without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a terminated server went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// Exited within the grace period after SIGTERM.
    Exited(Option<i32>),
    /// Ignored SIGTERM for the whole grace period and was killed.
    Killed,
    /// Had already exited before the signal was sent.
    AlreadyGone,
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationOutcome::Exited(Some(code)) => write!(f, "exited (code {code})"),
            TerminationOutcome::Exited(None) => f.write_str("exited (signal)"),
            TerminationOutcome::Killed => f.write_str("killed"),
            TerminationOutcome::AlreadyGone => f.write_str("already gone"),
        }
    }
}

/// Runs the external commands of a harness run.
pub trait ProcessRunner {
    /// Run `command` to completion and return its exit code (`None` if it
    /// was ended by a signal).
    fn run(
        &mut self,
        command: &CommandSpec,
    ) -> impl Future<Output = Result<Option<i32>, HarnessError>> + Send;

    /// Start `command` in the background and return its process id.
    fn spawn(&mut self, command: &CommandSpec) -> Result<u32, HarnessError>;

    /// Send SIGTERM to `pid`, wait up to `grace` for it to exit, then kill it.
    fn terminate(
        &mut self,
        pid: u32,
        grace: Duration,
    ) -> impl Future<Output = Result<TerminationOutcome, HarnessError>> + Send;
}

/// [`ProcessRunner`] backed by real OS processes.
///
/// Commands inherit stdout and stderr so the server log and the demo
/// walkthrough appear in the harness terminal. Background children are
/// kept here until terminated; they are not killed on drop.
#[derive(Debug, Default)]
pub struct SystemRunner {
    children: HashMap<u32, Child>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    async fn terminate_child(
        pid: u32,
        mut child: Child,
        grace: Duration,
    ) -> Result<TerminationOutcome, HarnessError> {
        let command = format!("pid {pid}");
        if child
            .try_wait()
            .map_err(|source| HarnessError::Wait {
                command: command.clone(),
                source,
            })?
            .is_some()
        {
            return Ok(TerminationOutcome::AlreadyGone);
        }

        send_signal(pid, Some(Signal::SIGTERM))?;

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => Ok(TerminationOutcome::Exited(status.code())),
            Ok(Err(source)) => Err(HarnessError::Wait { command, source }),
            Err(_) => {
                tracing::warn!(pid, grace_secs = grace.as_secs(), "Grace period expired, killing");
                child
                    .kill()
                    .await
                    .map_err(|source| HarnessError::Signal { pid, source })?;
                Ok(TerminationOutcome::Killed)
            }
        }
    }

    /// Terminate a process that was not started by this runner.
    async fn terminate_foreign(pid: u32, grace: Duration) -> Result<TerminationOutcome, HarnessError> {
        match send_signal(pid, Some(Signal::SIGTERM)) {
            Err(HarnessError::Signal { source, .. })
                if source.raw_os_error() == Some(Errno::ESRCH as i32) =>
            {
                return Ok(TerminationOutcome::AlreadyGone);
            }
            other => other?,
        }

        let deadline = tokio::time::Instant::now() + grace;
        while tokio::time::Instant::now() < deadline {
            if !is_alive(pid) {
                return Ok(TerminationOutcome::Exited(None));
            }
            tokio::time::sleep(LIVENESS_POLL_INTERVAL).await;
        }

        if !is_alive(pid) {
            return Ok(TerminationOutcome::Exited(None));
        }
        tracing::warn!(pid, grace_secs = grace.as_secs(), "Grace period expired, killing");
        send_signal(pid, Some(Signal::SIGKILL))?;
        Ok(TerminationOutcome::Killed)
    }
}

impl ProcessRunner for SystemRunner {
    /// The child is killed if this future is dropped, so a cancelled run
    /// leaves no foreground command behind.
    async fn run(&mut self, command: &CommandSpec) -> Result<Option<i32>, HarnessError> {
        let mut child = Self::command(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let status = child.wait().await.map_err(|source| HarnessError::Wait {
            command: command.to_string(),
            source,
        })?;
        Ok(status.code())
    }

    fn spawn(&mut self, command: &CommandSpec) -> Result<u32, HarnessError> {
        let child = Self::command(command)
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let pid = child.id().ok_or_else(|| HarnessError::NoPid {
            command: command.to_string(),
        })?;
        self.children.insert(pid, child);
        Ok(pid)
    }

    async fn terminate(
        &mut self,
        pid: u32,
        grace: Duration,
    ) -> Result<TerminationOutcome, HarnessError> {
        match self.children.remove(&pid) {
            Some(child) => Self::terminate_child(pid, child, grace).await,
            None => Self::terminate_foreign(pid, grace).await,
        }
    }
}

fn to_pid(pid: u32) -> Result<Pid, HarnessError> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| HarnessError::Signal {
            pid,
            source: std::io::Error::from(Errno::EINVAL),
        })
}

/// Deliver `sig` to `pid`; `None` only probes for existence.
fn send_signal(pid: u32, sig: Option<Signal>) -> Result<(), HarnessError> {
    signal::kill(to_pid(pid)?, sig).map_err(|errno| HarnessError::Signal {
        pid,
        source: std::io::Error::from(errno),
    })
}

fn is_alive(pid: u32) -> bool {
    send_signal(pid, None).is_ok()
}
