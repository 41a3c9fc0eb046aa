use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by the demo harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Another harness run holds the lock file.
    #[error("Another demo run is in progress (lock {path:?} held by pid {holder})")]
    AlreadyRunning { path: PathBuf, holder: String },

    /// The lock file could not be created or inspected.
    #[error("Failed to acquire run lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command could not be started at all.
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The server was started but the OS reported no process id.
    #[error("'{command}' started without a process id")]
    NoPid { command: String },

    /// Waiting on a started command failed.
    #[error("Failed to wait for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A readiness probe never succeeded within its poll policy.
    #[error("{target} not ready after {attempts} attempts ({elapsed:?}): {last_error}")]
    NotReady {
        target: String,
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },

    /// Delivering a signal to a process failed.
    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}
