//! Content report entity model and DTOs.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Report {
    pub id: DbId,
    pub reporter_id: DbId,
    pub reported_user_id: Option<DbId>,
    pub reported_listing_id: Option<DbId>,
    pub report_type: String,
    pub description: String,
    pub status: String,
    pub moderator_id: Option<DbId>,
    pub resolution: String,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub reporter_id: DbId,
    pub reported_user_id: Option<DbId>,
    pub reported_listing_id: Option<DbId>,
    pub report_type: String,
    pub description: String,
}

/// A moderator's step on a report. `resolved_at` is set only when the
/// report closes.
#[derive(Debug, Clone)]
pub struct ReportDecision {
    pub status: String,
    pub moderator_id: DbId,
    pub resolution: Option<String>,
    pub resolved_at: Option<Timestamp>,
}
