//! Retention cleanup for the append-only logs.
//!
//! Audit entries are never deleted.

use bazaar_core::types::Timestamp;
use bazaar_db::repositories::{ActivityLogRepo, LoginAttemptRepo, NotificationRepo};
use chrono::{Duration, Utc};
use sqlx::PgConnection;

use crate::config::RetentionConfig;
use crate::error::EngineResult;
use crate::Engine;

/// Rows removed by one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub activity_deleted: u64,
    pub failed_logins_deleted: u64,
    pub notifications_deleted: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.activity_deleted + self.failed_logins_deleted + self.notifications_deleted
    }
}

impl Engine {
    pub async fn cleanup_old_logs(&self) -> EngineResult<CleanupReport> {
        self.cleanup_old_logs_at(Utc::now()).await
    }

    /// Delete activity entries, idle failed-login records, and read
    /// notifications older than their retention windows.
    ///
    /// A failed-login record whose block is still running is kept regardless
    /// of age.
    pub async fn cleanup_old_logs_at(&self, now: Timestamp) -> EngineResult<CleanupReport> {
        let mut tx = self.pool.begin().await?;
        let result = cleanup_in(&mut tx, &self.config.retention, now).await;
        let report = self.finish(tx, result, None, "cleanup_old_logs").await?;

        tracing::info!(
            activity_deleted = report.activity_deleted,
            failed_logins_deleted = report.failed_logins_deleted,
            notifications_deleted = report.notifications_deleted,
            "Retention cleanup complete"
        );
        Ok(report)
    }
}

async fn cleanup_in(
    conn: &mut PgConnection,
    retention: &RetentionConfig,
    now: Timestamp,
) -> EngineResult<CleanupReport> {
    let activity_cutoff = now - Duration::days(retention.activity_log_days);
    let login_cutoff = now - Duration::days(retention.failed_login_days);
    let notification_cutoff = now - Duration::days(retention.read_notification_days);

    Ok(CleanupReport {
        activity_deleted: ActivityLogRepo::delete_before(conn, activity_cutoff).await?,
        failed_logins_deleted: LoginAttemptRepo::delete_stale(conn, login_cutoff, now).await?,
        notifications_deleted: NotificationRepo::delete_read_before(conn, notification_cutoff)
            .await?,
    })
}
