//! Readiness waits between harness steps.
//!
//! A [`Probe`] says how to tell that a dependency is up; a [`PollPolicy`]
//! bounds how long to keep asking. [`poll_until_ready`] is the shared loop:
//! it retries a single attempt at a fixed interval until the attempt
//! succeeds, the attempt budget is spent, or the overall timeout expires.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::HarnessError;

/// How readiness of a dependency is detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Wait a fixed duration and assume the dependency is up.
    Delay(Duration),
    /// A TCP connection to `host:port` is accepted.
    Tcp(String),
    /// An HTTP GET to the URL answers with a 2xx status.
    Http(String),
}

impl Probe {
    /// Parse `tcp://host:port`, `http(s)://...` or `delay:<seconds>`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Some(addr) = raw.strip_prefix("tcp://") {
            if addr.rsplit_once(':').is_none_or(|(host, port)| {
                host.is_empty() || port.parse::<u16>().is_err()
            }) {
                return Err(format!("'{raw}' must look like tcp://host:port"));
            }
            return Ok(Probe::Tcp(addr.to_string()));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Probe::Http(raw.to_string()));
        }
        if let Some(secs) = raw.strip_prefix("delay:") {
            return secs
                .trim()
                .parse::<u64>()
                .map(|s| Probe::Delay(Duration::from_secs(s)))
                .map_err(|e| format!("'{raw}': {e}"));
        }
        Err(format!(
            "'{raw}' is not a probe (expected tcp://host:port, http(s)://url or delay:<secs>)"
        ))
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Delay(d) => write!(f, "delay:{}", d.as_secs()),
            Probe::Tcp(addr) => write!(f, "tcp://{addr}"),
            Probe::Http(url) => f.write_str(url),
        }
    }
}

/// Bounds on a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between failed attempts.
    pub interval: Duration,
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Overall deadline, including time spent inside attempts.
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be non-zero".into());
        }
        Ok(())
    }
}

/// What to wait for and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessSpec {
    pub probe: Probe,
    pub policy: PollPolicy,
}

/// Result of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Waits until a dependency reports ready.
pub trait Readiness {
    /// `target` names the dependency in logs and errors.
    fn wait_until_ready(
        &self,
        target: &str,
        spec: &ReadinessSpec,
    ) -> impl Future<Output = Result<Ready, HarnessError>> + Send;
}

/// [`Readiness`] that performs real TCP connects and HTTP requests.
#[derive(Debug, Clone)]
pub struct ProbeChecker {
    http: reqwest::Client,
}

impl ProbeChecker {
    /// `attempt_timeout` caps each individual HTTP request.
    pub fn new(attempt_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(attempt_timeout).build()?;
        Ok(Self { http })
    }

    async fn check_tcp(addr: &str) -> Result<(), String> {
        tokio::net::TcpStream::connect(addr)
            .await
            .map(drop)
            .map_err(|e| e.to_string())
    }

    async fn check_http(&self, url: &str) -> Result<(), String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }
}

impl Readiness for ProbeChecker {
    async fn wait_until_ready(&self, target: &str, spec: &ReadinessSpec) -> Result<Ready, HarnessError> {
        match &spec.probe {
            Probe::Delay(delay) => {
                tracing::info!(target_name = target, delay_secs = delay.as_secs(), "Waiting fixed delay");
                tokio::time::sleep(*delay).await;
                Ok(Ready {
                    attempts: 1,
                    elapsed: *delay,
                })
            }
            Probe::Tcp(addr) => {
                poll_until_ready(target, &spec.policy, || Self::check_tcp(addr)).await
            }
            Probe::Http(url) => poll_until_ready(target, &spec.policy, || self.check_http(url)).await,
        }
    }
}

/// Retry `attempt` under `policy` until it returns `Ok`.
///
/// Each attempt is cut short by whatever remains of the overall timeout.
/// Exhausting attempts or time yields [`HarnessError::NotReady`] carrying
/// the last failure.
pub async fn poll_until_ready<F, Fut>(
    target: &str,
    policy: &PollPolicy,
    mut attempt: F,
) -> Result<Ready, HarnessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts = 0u32;
    let mut last_error = String::from("no attempt made");

    while attempts < policy.max_attempts {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        attempts += 1;
        match tokio::time::timeout(remaining, attempt()).await {
            Ok(Ok(())) => {
                let elapsed = start.elapsed();
                tracing::info!(
                    target_name = target,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Ready",
                );
                return Ok(Ready { attempts, elapsed });
            }
            Ok(Err(e)) => {
                tracing::debug!(target_name = target, attempts, error = %e, "Not ready yet");
                last_error = e;
            }
            Err(_) => {
                last_error = "attempt timed out".into();
                break;
            }
        }

        if attempts < policy.max_attempts {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(policy.interval.min(remaining)).await;
        }
    }

    Err(HarnessError::NotReady {
        target: target.to_string(),
        attempts,
        elapsed: start.elapsed(),
        last_error,
    })
}
