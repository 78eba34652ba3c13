//! Derived per-user listing counters.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_statistics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserStatistics {
    pub user_id: DbId,
    pub listings_count: i64,
    pub sold_count: i64,
    /// Sum of sold listing prices, minor units.
    pub total_earnings: i64,
    pub updated_at: Timestamp,
}
