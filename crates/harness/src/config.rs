use std::path::PathBuf;
use std::time::Duration;

use crate::readiness::{PollPolicy, Probe, ReadinessSpec};
use crate::runner::CommandSpec;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

const DEFAULT_STACK_UP: &str = "docker compose up -d";
const DEFAULT_STACK_DOWN: &str = "docker compose down";
const DEFAULT_DEPS: &str = "cargo build --release --bin dbprov-api --bin dbprov-client";
const DEFAULT_SERVER: &str = "target/release/dbprov-api";
const DEFAULT_CLIENT: &str = "target/release/dbprov-client";
const DEFAULT_STACK_PROBE: &str = "tcp://127.0.0.1:5445";
const DEFAULT_SERVER_PROBE: &str = "http://127.0.0.1:8000/health";

/// Message printed once the server has been stopped.
pub const DEFAULT_COMPLETION_MESSAGE: &str = "Demo complete!";

/// Harness configuration loaded from `HARNESS_*` environment variables.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Brings the container stack up, detached.
    pub stack_up: CommandSpec,
    /// Tears the stack down after the run; `None` leaves it running.
    pub stack_down: Option<CommandSpec>,
    /// Builds or installs what the server and client need.
    pub deps: CommandSpec,
    /// Long-running server, launched in the background.
    pub server: CommandSpec,
    /// Demonstration client, run to completion.
    pub client: CommandSpec,
    pub stack_readiness: ReadinessSpec,
    pub server_readiness: ReadinessSpec,
    /// Time the server gets to exit after SIGTERM before it is killed.
    pub termination_grace: Duration,
    /// Lock file guarding against overlapping runs.
    pub lock_path: PathBuf,
    pub completion_message: String,
}

impl HarnessConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                                   |
    /// |--------------------------------------|-------------------------------------------|
    /// | `HARNESS_STACK_UP_CMD`               | `docker compose up -d`                    |
    /// | `HARNESS_STACK_DOWN`                 | `false`                                   |
    /// | `HARNESS_STACK_DOWN_CMD`             | `docker compose down`                     |
    /// | `HARNESS_DEPS_CMD`                   | `cargo build --release --bin ...`         |
    /// | `HARNESS_SERVER_CMD`                 | `target/release/dbprov-api`               |
    /// | `HARNESS_CLIENT_CMD`                 | `target/release/dbprov-client`            |
    /// | `HARNESS_STACK_PROBE`                | `tcp://127.0.0.1:5445`                    |
    /// | `HARNESS_STACK_POLL_INTERVAL_MS`     | `1000`                                    |
    /// | `HARNESS_STACK_POLL_ATTEMPTS`        | `30`                                      |
    /// | `HARNESS_STACK_TIMEOUT_SECS`         | `60`                                      |
    /// | `HARNESS_SERVER_PROBE`               | `http://127.0.0.1:8000/health`            |
    /// | `HARNESS_SERVER_POLL_INTERVAL_MS`    | `500`                                     |
    /// | `HARNESS_SERVER_POLL_ATTEMPTS`       | `60`                                      |
    /// | `HARNESS_SERVER_TIMEOUT_SECS`        | `30`                                      |
    /// | `HARNESS_TERMINATION_GRACE_SECS`     | `10`                                      |
    /// | `HARNESS_LOCK_PATH`                  | `$TMPDIR/dbprov-demo.lock`                |
    /// | `HARNESS_COMPLETION_MESSAGE`         | `Demo complete!`                          |
    ///
    /// Probes accept `tcp://host:port`, `http(s)://url` or `delay:<secs>`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let command = |key: &str, default: &str| {
            let value = get(key, default);
            CommandSpec::parse(&value).ok_or_else(|| invalid(key, value, "command must not be blank"))
        };

        let stack_down = if parse_bool("HARNESS_STACK_DOWN", get("HARNESS_STACK_DOWN", "false"))? {
            Some(command("HARNESS_STACK_DOWN_CMD", DEFAULT_STACK_DOWN)?)
        } else {
            None
        };

        let stack_readiness = readiness(&get, "STACK", DEFAULT_STACK_PROBE, (1_000, 30, 60))?;
        let server_readiness = readiness(&get, "SERVER", DEFAULT_SERVER_PROBE, (500, 60, 30))?;

        let termination_grace = Duration::from_secs(parse_number(
            "HARNESS_TERMINATION_GRACE_SECS",
            get("HARNESS_TERMINATION_GRACE_SECS", "10"),
        )?);

        let lock_path = lookup("HARNESS_LOCK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("dbprov-demo.lock"));

        Ok(Self {
            stack_up: command("HARNESS_STACK_UP_CMD", DEFAULT_STACK_UP)?,
            stack_down,
            deps: command("HARNESS_DEPS_CMD", DEFAULT_DEPS)?,
            server: command("HARNESS_SERVER_CMD", DEFAULT_SERVER)?,
            client: command("HARNESS_CLIENT_CMD", DEFAULT_CLIENT)?,
            stack_readiness,
            server_readiness,
            termination_grace,
            lock_path,
            completion_message: get("HARNESS_COMPLETION_MESSAGE", DEFAULT_COMPLETION_MESSAGE),
        })
    }
}

/// Read `HARNESS_{scope}_PROBE` and its poll policy.
///
/// `defaults` is `(interval_ms, attempts, timeout_secs)`.
fn readiness<G>(
    get: &G,
    scope: &str,
    default_probe: &str,
    defaults: (u64, u32, u64),
) -> Result<ReadinessSpec, ConfigError>
where
    G: Fn(&str, &str) -> String,
{
    let (interval_ms, attempts, timeout_secs) = defaults;

    let probe_var = format!("HARNESS_{scope}_PROBE");
    let raw = get(&probe_var, default_probe);
    let probe = Probe::parse(&raw).map_err(|reason| invalid(&probe_var, raw, &reason))?;

    let interval_var = format!("HARNESS_{scope}_POLL_INTERVAL_MS");
    let attempts_var = format!("HARNESS_{scope}_POLL_ATTEMPTS");
    let timeout_var = format!("HARNESS_{scope}_TIMEOUT_SECS");

    let policy = PollPolicy {
        interval: Duration::from_millis(parse_number(
            &interval_var,
            get(&interval_var, &interval_ms.to_string()),
        )?),
        max_attempts: parse_number(&attempts_var, get(&attempts_var, &attempts.to_string()))?,
        timeout: Duration::from_secs(parse_number(
            &timeout_var,
            get(&timeout_var, &timeout_secs.to_string()),
        )?),
    };
    policy.validate().map_err(|reason| {
        invalid(
            &format!("HARNESS_{scope}_POLL_*"),
            format!("{policy:?}"),
            &reason,
        )
    })?;

    Ok(ReadinessSpec { probe, policy })
}

fn invalid(var: &str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        value,
        reason: reason.to_string(),
    }
}

fn parse_number<T>(var: &str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(var, value, &e.to_string())),
    }
}

fn parse_bool(var: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}
