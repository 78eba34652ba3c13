//! The listing-lifecycle and trust-consistency engine.
//!
//! [`Engine`] is the entry point. Every mutating operation runs in a single
//! database transaction covering the primary write, derived-state
//! recomputation (statistics, reputation), notifications, and log entries.
//! Log writes are best-effort: a failed log append is reported through
//! `tracing` and never rolls back the business change.

use std::sync::Arc;

use bazaar_core::audit::{security_action, security_events};
use bazaar_core::types::DbId;
use bazaar_db::models::activity::CreateActivityLogEntry;
use sqlx::{PgPool, Postgres, Transaction};

pub mod authorizer;
pub mod categories;
pub mod config;
pub mod error;
pub mod listings;
pub mod logging;
pub mod login;
pub mod maintenance;
pub mod moderation;
pub mod notifications;
pub mod password;
pub mod reports;
pub mod reputation;
pub mod reviews;
pub mod search;
pub mod statistics;
pub mod users;

use config::EngineConfig;
use error::{EngineResult, ErrorKind};
use logging::ActivityLogger;

/// Shared handle to the engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    pool: PgPool,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(pool: PgPool, config: EngineConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Commit on success, roll back on failure.
    ///
    /// A permission denial is also written as a security event once the
    /// transaction is gone, so the event survives the rollback.
    async fn finish<T>(
        &self,
        tx: Transaction<'_, Postgres>,
        result: EngineResult<T>,
        actor_id: Option<DbId>,
        action: &str,
    ) -> EngineResult<T> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, action, "Rollback failed");
                }
                if err.kind() == ErrorKind::Permission {
                    self.security_event(
                        actor_id,
                        security_events::PERMISSION_DENIED,
                        serde_json::json!({ "action": action, "reason": err.to_string() }),
                        None,
                    )
                    .await;
                }
                Err(err)
            }
        }
    }

    /// Record a security event outside any business transaction.
    async fn security_event(
        &self,
        user_id: Option<DbId>,
        event: &str,
        details: serde_json::Value,
        ip_address: Option<&str>,
    ) {
        tracing::warn!(user_id, event, ip_address, "Security event");
        ActivityLogger::record_detached(
            &self.pool,
            CreateActivityLogEntry {
                user_id,
                action: security_action(event),
                details: Some(details),
                ip_address: ip_address.map(str::to_string),
                ..Default::default()
            },
        )
        .await;
    }
}
