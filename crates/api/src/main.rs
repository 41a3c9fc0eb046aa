use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbprov_api::config::ServerConfig;
use dbprov_api::router::build_app_router;
use dbprov_api::state::AppState;
use dbprov_db::DbPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .with_context(|| format!("Invalid HOST '{}'", config.host))?,
        config.port,
    );
    let pool_close_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let pool = prepare_database(&config.database_url).await?;
    let app = build_app_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Provisioning API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("No longer accepting requests, closing database pool");
    if tokio::time::timeout(pool_close_timeout, pool.close()).await.is_err() {
        tracing::warn!(
            timeout_secs = pool_close_timeout.as_secs(),
            "Database pool did not close in time"
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dbprov_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Connect, verify and migrate. Any failure aborts startup so the demo
/// harness sees the server never becoming ready.
async fn prepare_database(url: &str) -> anyhow::Result<DbPool> {
    let pool = dbprov_db::create_pool(url)
        .await
        .context("Failed to connect to database")?;
    dbprov_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    dbprov_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database connected and migrated");
    Ok(pool)
}

/// Resolves on Ctrl-C or SIGTERM. The harness stops the server with SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Shutting down");
}
