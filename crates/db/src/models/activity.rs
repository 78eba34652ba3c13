//! User activity log model, insert DTO, and query filter.
//!
//! Entries are immutable; the only delete path is retention cleanup.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_activity_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLogEntry {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for appending an activity entry. `user_id` is `None` for system
/// actions such as the expiry sweep.
#[derive(Debug, Clone, Default)]
pub struct CreateActivityLogEntry {
    pub user_id: Option<DbId>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Filter parameters for listing activity.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
