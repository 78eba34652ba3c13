use std::time::Duration;

use anyhow::Context;
use bazaar_engine::config::EngineConfig;
use bazaar_engine::Engine;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod sweeps;

use config::WorkerConfig;

/// How long running sweeps get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar_worker=info,bazaar_engine=info".into()),
        )
        .with(config.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let engine_config = EngineConfig::from_env().context("Invalid engine configuration")?;
    tracing::info!(
        max_connections = config.max_connections,
        listing_max_age_days = engine_config.listing_max_age_days,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = bazaar_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    bazaar_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    bazaar_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let engine = Engine::new(pool.clone(), engine_config);

    // --- Sweeps ---
    let cancel = CancellationToken::new();
    let expiry_handle = tokio::spawn(sweeps::run_expiry(
        engine.clone(),
        config.expiry_interval,
        cancel.clone(),
    ));
    let retention_handle = tokio::spawn(sweeps::run_retention(
        engine,
        config.retention_interval,
        cancel.clone(),
    ));

    shutdown_signal().await?;

    cancel.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, expiry_handle).await;
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, retention_handle).await;
    pool.close().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to install Ctrl-C handler")?;
                tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, starting graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl-C handler")?;
        tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
    }

    Ok(())
}
