use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the provisioning API.
    pub api_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Pause between demo phases.
    pub phase_pause: Duration,
    /// Health polls made before the demo starts.
    pub startup_attempts: u32,
    /// Delay between startup health polls.
    pub startup_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(10),
            phase_pause: Duration::from_secs(2),
            startup_attempts: 10,
            startup_interval: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `PROVISIONING_API_URL`     | `http://localhost:8000`  |
    /// | `CLIENT_TIMEOUT_SECS`      | `10`                     |
    /// | `DEMO_PHASE_PAUSE_MS`      | `2000`                   |
    /// | `DEMO_STARTUP_ATTEMPTS`    | `10`                     |
    /// | `DEMO_STARTUP_INTERVAL_MS` | `500`                    |
    ///
    /// Unparseable numbers fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u64| -> u64 {
            match lookup(key) {
                None => default,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(var = key, value = %raw, default, "Ignoring invalid number");
                    default
                }),
            }
        };

        Self {
            api_url: lookup("PROVISIONING_API_URL").unwrap_or(defaults.api_url),
            request_timeout: Duration::from_secs(number(
                "CLIENT_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            phase_pause: Duration::from_millis(number(
                "DEMO_PHASE_PAUSE_MS",
                defaults.phase_pause.as_millis() as u64,
            )),
            startup_attempts: number("DEMO_STARTUP_ATTEMPTS", u64::from(defaults.startup_attempts))
                .clamp(1, u64::from(u32::MAX)) as u32,
            startup_interval: Duration::from_millis(number(
                "DEMO_STARTUP_INTERVAL_MS",
                defaults.startup_interval.as_millis() as u64,
            )),
        }
    }
}
