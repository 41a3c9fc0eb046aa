use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbprov_harness::config::HarnessConfig;
use dbprov_harness::harness::{Harness, StepStatus};
use dbprov_harness::readiness::ProbeChecker;
use dbprov_harness::runner::SystemRunner;

/// Upper bound on a single HTTP readiness request.
const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dbprov_harness=info".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = HarnessConfig::from_env().context("Invalid harness configuration")?;
    let checker = ProbeChecker::new(PROBE_REQUEST_TIMEOUT)
        .context("Failed to build HTTP client for readiness probes")?;

    let mut harness = Harness::new(config, SystemRunner::new(), checker, std::io::stdout());

    let cancel = harness.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("Interrupted, stopping demo");
        cancel.cancel();
    });

    let report = harness.run().await?;

    for record in &report.steps {
        match &record.status {
            StepStatus::Ok => {}
            StepStatus::Failed(reason) => {
                tracing::warn!(step = %record.step, reason = %reason, "Step did not succeed");
            }
            StepStatus::Skipped(reason) => {
                tracing::debug!(step = %record.step, reason = %reason, "Step skipped");
            }
        }
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            server_pid = ?report.server_pid,
            cancelled = report.cancelled,
            "Demo run did not complete"
        );
        Ok(ExitCode::FAILURE)
    }
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
