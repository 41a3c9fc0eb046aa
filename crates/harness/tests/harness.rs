//! Step-sequence tests for the demo harness using a recording process
//! runner and scripted readiness.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use dbprov_harness::config::HarnessConfig;
use dbprov_harness::error::HarnessError;
use dbprov_harness::harness::{Harness, Step, StepStatus};
use dbprov_harness::lock::RunLock;
use dbprov_harness::readiness::{PollPolicy, Probe, ProbeChecker, Readiness, ReadinessSpec, Ready};
use dbprov_harness::runner::{CommandSpec, ProcessRunner, SystemRunner, TerminationOutcome};

type Events = Arc<Mutex<Vec<String>>>;

const SERVER_PID: u32 = 4242;

#[derive(Clone)]
struct FakeRunner {
    events: Events,
    client_exit: Option<i32>,
    fail_spawn: bool,
    fail_stack_up: bool,
    client_started_at: Arc<Mutex<Option<Instant>>>,
    /// Fires the token when the named command runs. A cancelled client
    /// never finishes on its own.
    cancel_during: Arc<Mutex<Option<(&'static str, CancellationToken)>>>,
}

impl FakeRunner {
    fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            client_exit: Some(0),
            fail_spawn: false,
            fail_stack_up: false,
            client_started_at: Arc::new(Mutex::new(None)),
            cancel_during: Arc::new(Mutex::new(None)),
        }
    }
}

impl ProcessRunner for FakeRunner {
    async fn run(&mut self, command: &CommandSpec) -> Result<Option<i32>, HarnessError> {
        self.events.lock().unwrap().push(format!("run:{}", command.program));
        let cancel_during = self.cancel_during.lock().unwrap().clone();
        if let Some((program, token)) = cancel_during {
            if program == command.program {
                token.cancel();
                if command.program == "client" {
                    std::future::pending::<()>().await;
                }
            }
        }
        match command.program.as_str() {
            "client" => {
                *self.client_started_at.lock().unwrap() = Some(Instant::now());
                Ok(self.client_exit)
            }
            "stack-up" if self.fail_stack_up => Err(HarnessError::Spawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "docker not found"),
            }),
            _ => Ok(Some(0)),
        }
    }

    fn spawn(&mut self, command: &CommandSpec) -> Result<u32, HarnessError> {
        self.events.lock().unwrap().push(format!("spawn:{}", command.program));
        if self.fail_spawn {
            Err(HarnessError::NoPid {
                command: command.to_string(),
            })
        } else {
            Ok(SERVER_PID)
        }
    }

    async fn terminate(
        &mut self,
        pid: u32,
        _grace: Duration,
    ) -> Result<TerminationOutcome, HarnessError> {
        self.events.lock().unwrap().push(format!("terminate:{pid}"));
        Ok(TerminationOutcome::Exited(Some(0)))
    }
}

/// Readiness that answers immediately, failing for the listed targets.
struct ScriptedReadiness {
    events: Events,
    not_ready: Vec<&'static str>,
}

impl Readiness for ScriptedReadiness {
    async fn wait_until_ready(&self, target: &str, _spec: &ReadinessSpec) -> Result<Ready, HarnessError> {
        self.events.lock().unwrap().push(format!("wait:{target}"));
        if self.not_ready.iter().any(|t| *t == target) {
            Err(HarnessError::NotReady {
                target: target.to_string(),
                attempts: 3,
                elapsed: Duration::from_millis(30),
                last_error: "connection refused".into(),
            })
        } else {
            Ok(Ready {
                attempts: 1,
                elapsed: Duration::ZERO,
            })
        }
    }
}

/// Writer that logs each completed line into the shared event list.
struct EventWriter {
    events: Events,
    buffer: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim_end().to_string();
            self.events.lock().unwrap().push(format!("out:{text}"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn spec(probe: Probe) -> ReadinessSpec {
    ReadinessSpec {
        probe,
        policy: PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 3,
            timeout: Duration::from_secs(1),
        },
    }
}

fn test_config(dir: &TempDir) -> HarnessConfig {
    HarnessConfig {
        stack_up: CommandSpec::new("stack-up", ["-d"]),
        stack_down: None,
        deps: CommandSpec::new("deps", Vec::<String>::new()),
        server: CommandSpec::new("server", Vec::<String>::new()),
        client: CommandSpec::new("client", Vec::<String>::new()),
        stack_readiness: spec(Probe::Tcp("127.0.0.1:5445".into())),
        server_readiness: spec(Probe::Http("http://127.0.0.1:8000/health".into())),
        termination_grace: Duration::from_secs(1),
        lock_path: dir.path().join("demo.lock"),
        completion_message: "Demo complete!".into(),
    }
}

fn writer(events: &Events) -> EventWriter {
    EventWriter {
        events: events.clone(),
        buffer: Vec::new(),
    }
}

fn readiness(events: &Events, not_ready: Vec<&'static str>) -> ScriptedReadiness {
    ScriptedReadiness {
        events: events.clone(),
        not_ready,
    }
}

fn recorded(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

#[tokio::test]
async fn steps_run_in_order() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut harness = Harness::new(
        test_config(&dir),
        FakeRunner::new(&events),
        readiness(&events, vec![]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    assert_eq!(
        recorded(&events),
        vec![
            "run:stack-up",
            "wait:stack",
            "run:deps",
            "spawn:server",
            "wait:server",
            "run:client",
            "terminate:4242",
            "out:Demo complete!",
        ]
    );
    assert!(report.is_success());
    assert_eq!(report.server_pid, Some(SERVER_PID));
    assert_eq!(report.client_exit_code, Some(0));
    assert_eq!(report.termination, Some(TerminationOutcome::Exited(Some(0))));

    let steps: Vec<Step> = report.steps.iter().map(|r| r.step).collect();
    assert_eq!(
        steps,
        vec![
            Step::StackUp,
            Step::StackReady,
            Step::DepsInstalled,
            Step::ServerStarted,
            Step::ServerReady,
            Step::ClientRun,
            Step::ServerStopped,
            Step::Done,
        ]
    );
}

#[tokio::test]
async fn failing_client_still_stops_server() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut runner = FakeRunner::new(&events);
    runner.client_exit = Some(1);
    let mut harness = Harness::new(
        test_config(&dir),
        runner,
        readiness(&events, vec![]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    assert!(events.contains(&"terminate:4242".to_string()));
    assert_eq!(events.last().unwrap(), "out:Demo complete!");
    assert_eq!(report.client_exit_code, Some(1));
    assert_matches!(report.status(Step::ClientRun), Some(StepStatus::Failed(_)));
    // The client's exit status is not a harness failure.
    assert!(report.is_success());
}

#[tokio::test]
async fn missing_pid_never_terminates() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut runner = FakeRunner::new(&events);
    runner.fail_spawn = true;
    let mut harness = Harness::new(
        test_config(&dir),
        runner,
        readiness(&events, vec![]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    assert!(!events.iter().any(|e| e.starts_with("terminate:")));
    assert!(!events.contains(&"run:client".to_string()));
    assert!(!events.iter().any(|e| e.starts_with("out:")));
    assert_eq!(report.server_pid, None);
    assert_matches!(report.status(Step::ServerStarted), Some(StepStatus::Failed(_)));
    assert_matches!(report.status(Step::ServerStopped), Some(StepStatus::Skipped(_)));
    assert!(!report.is_success());
}

#[tokio::test]
async fn setup_failures_are_not_fatal() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut runner = FakeRunner::new(&events);
    runner.fail_stack_up = true;
    let mut harness = Harness::new(
        test_config(&dir),
        runner,
        readiness(&events, vec!["stack"]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    assert_matches!(report.status(Step::StackUp), Some(StepStatus::Failed(_)));
    assert_matches!(report.status(Step::StackReady), Some(StepStatus::Failed(_)));
    assert_eq!(report.status(Step::ClientRun), Some(&StepStatus::Ok));
    assert!(recorded(&events).contains(&"terminate:4242".to_string()));
}

#[tokio::test]
async fn server_not_ready_skips_client_but_stops_server() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut harness = Harness::new(
        test_config(&dir),
        FakeRunner::new(&events),
        readiness(&events, vec!["server"]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    assert!(!events.contains(&"run:client".to_string()));
    assert!(events.contains(&"terminate:4242".to_string()));
    assert_matches!(report.status(Step::ClientRun), Some(StepStatus::Skipped(_)));
    assert!(!report.is_success());
}

#[tokio::test]
async fn completion_message_printed_once_after_termination() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut harness = Harness::new(
        test_config(&dir),
        FakeRunner::new(&events),
        readiness(&events, vec![]),
        writer(&events),
    );

    harness.run().await.unwrap();

    let events = recorded(&events);
    let completions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| *e == "out:Demo complete!")
        .map(|(i, _)| i)
        .collect();
    let terminate = events.iter().position(|e| e == "terminate:4242").unwrap();
    assert_eq!(completions.len(), 1);
    assert!(completions[0] > terminate);
}

#[tokio::test]
async fn stack_down_runs_after_server_stop_when_enabled() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut config = test_config(&dir);
    config.stack_down = Some(CommandSpec::new("stack-down", Vec::<String>::new()));
    let mut harness = Harness::new(
        config,
        FakeRunner::new(&events),
        readiness(&events, vec![]),
        writer(&events),
    );

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    let terminate = events.iter().position(|e| e == "terminate:4242").unwrap();
    let down = events.iter().position(|e| e == "run:stack-down").unwrap();
    assert!(down > terminate);
    assert_eq!(report.status(Step::StackDown), Some(&StepStatus::Ok));
}

#[tokio::test]
async fn overlapping_run_reports_conflict() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let _held = RunLock::acquire(&config.lock_path).unwrap();

    let events = Events::default();
    let mut harness = Harness::new(
        config,
        FakeRunner::new(&events),
        readiness(&events, vec![]),
        writer(&events),
    );

    let err = harness.run().await.unwrap_err();
    assert_matches!(err, HarnessError::AlreadyRunning { .. });
    assert!(recorded(&events).is_empty());
}

#[tokio::test]
async fn cancellation_before_start_still_reports() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut harness = Harness::new(
        test_config(&dir),
        FakeRunner::new(&events),
        readiness(&events, vec![]),
        writer(&events),
    );
    harness.cancel_token().cancel();

    let report = harness.run().await.unwrap();

    assert!(report.cancelled);
    assert!(!recorded(&events).iter().any(|e| e.starts_with("spawn:")));
    assert!(!report.is_success());
}

#[tokio::test]
async fn cancellation_during_deps_never_starts_server() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let runner = FakeRunner::new(&events);
    let cancel_during = runner.cancel_during.clone();
    let mut harness = Harness::new(
        test_config(&dir),
        runner,
        readiness(&events, vec![]),
        writer(&events),
    );
    *cancel_during.lock().unwrap() = Some(("deps", harness.cancel_token()));

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    assert_eq!(events.last().unwrap(), "run:deps");
    assert!(report.cancelled);
    assert_eq!(report.server_pid, None);
    assert_matches!(report.status(Step::ServerStarted), Some(StepStatus::Skipped(_)));
    assert_matches!(report.status(Step::ServerStopped), Some(StepStatus::Skipped(_)));
}

#[tokio::test]
async fn cancellation_during_client_still_stops_server() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let runner = FakeRunner::new(&events);
    let cancel_during = runner.cancel_during.clone();
    let mut harness = Harness::new(
        test_config(&dir),
        runner,
        readiness(&events, vec![]),
        writer(&events),
    );
    *cancel_during.lock().unwrap() = Some(("client", harness.cancel_token()));

    let report = harness.run().await.unwrap();

    let events = recorded(&events);
    let client = events.iter().position(|e| e == "run:client").unwrap();
    let terminate = events.iter().position(|e| e == "terminate:4242").unwrap();
    assert!(terminate > client);
    assert!(report.cancelled);
    assert_matches!(report.status(Step::ClientRun), Some(StepStatus::Skipped(_)));
    assert_eq!(report.status(Step::ServerStopped), Some(&StepStatus::Ok));
    assert!(!report.is_success());
}

#[tokio::test]
async fn cancelled_client_process_is_killed() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let marker = dir.path().join("client-finished");
    let script = format!("sleep 1; touch {}", marker.display());

    let mut config = test_config(&dir);
    config.stack_up = CommandSpec::new("true", Vec::<String>::new());
    config.deps = CommandSpec::new("true", Vec::<String>::new());
    config.server = CommandSpec::new("sleep", ["30"]);
    config.client = CommandSpec::new("sh", ["-c", script.as_str()]);

    let mut harness = Harness::new(
        config,
        SystemRunner::new(),
        readiness(&events, vec![]),
        writer(&events),
    );
    let cancel = harness.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let report = harness.run().await.unwrap();
    assert!(report.cancelled);
    assert!(report.termination.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test(start_paused = true)]
async fn fixed_delays_add_up_before_client() {
    let dir = TempDir::new().unwrap();
    let events = Events::default();
    let mut config = test_config(&dir);
    config.stack_readiness = spec(Probe::Delay(Duration::from_secs(10)));
    config.server_readiness = spec(Probe::Delay(Duration::from_secs(5)));
    let runner = FakeRunner::new(&events);
    let client_started_at = runner.client_started_at.clone();
    let checker = ProbeChecker::new(Duration::from_secs(1)).unwrap();
    let mut harness = Harness::new(config, runner, checker, writer(&events));

    let start = Instant::now();
    let report = harness.run().await.unwrap();

    let client_at = client_started_at.lock().unwrap().unwrap();
    assert!(client_at.duration_since(start) >= Duration::from_secs(15));
    assert!(report.is_success());
}
