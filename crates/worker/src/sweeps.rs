//! Periodic maintenance loops.
//!
//! Each loop runs on a fixed `tokio::time::interval` until its cancellation
//! token fires. A failed run is logged and retried on the next tick.

use std::time::Duration;

use bazaar_engine::Engine;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Expire active listings that are past their expiry date or too old.
pub async fn run_expiry(engine: Engine, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Listing expiry sweep started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Listing expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match engine.expire_listings().await {
                    Ok(0) => tracing::debug!("Expiry sweep: nothing to expire"),
                    Ok(expired) => tracing::info!(expired, "Expiry sweep: listings expired"),
                    Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                }
            }
        }
    }
}

/// Delete log rows past their retention windows.
pub async fn run_retention(engine: Engine, every: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = every.as_secs(),
        activity_log_days = engine.config().retention.activity_log_days,
        failed_login_days = engine.config().retention.failed_login_days,
        read_notification_days = engine.config().retention.read_notification_days,
        "Retention cleanup started"
    );

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention cleanup stopping");
                break;
            }
            _ = interval.tick() => {
                match engine.cleanup_old_logs().await {
                    Ok(report) if report.total() > 0 => {
                        tracing::info!(deleted = report.total(), "Retention cleanup: purged old rows");
                    }
                    Ok(_) => tracing::debug!("Retention cleanup: no rows to purge"),
                    Err(e) => tracing::error!(error = %e, "Retention cleanup failed"),
                }
            }
        }
    }
}
