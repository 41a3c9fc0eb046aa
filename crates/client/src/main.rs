use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbprov_client::api::ProvisioningClient;
use dbprov_client::config::ClientConfig;
use dbprov_client::demo::Demo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the walkthrough on stdout stays readable.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dbprov_client=info".into());
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

    let config = ClientConfig::from_env();
    tracing::info!(api_url = %config.api_url, "Starting provisioning demo");

    let client = ProvisioningClient::new(&config.api_url, config.request_timeout)
        .context("Failed to build HTTP client")?;

    let health = client
        .wait_until_healthy(config.startup_attempts, config.startup_interval)
        .await
        .context("Provisioning API is not available")?;
    tracing::info!(version = %health.version, "Provisioning API is healthy");

    let summary = Demo::new(&client, config.phase_pause, std::io::stdout())
        .run()
        .await
        .context("Demo failed")?;

    tracing::info!(
        submitted = summary.submitted.len(),
        approved = summary.approved,
        rejected = summary.rejected,
        databases = summary.databases,
        total_monthly_cost = summary.total_monthly_cost,
        "Demo finished"
    );
    Ok(())
}
