//! Derived reputation row.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_reputations` table. Written only by the reputation
/// engine.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserReputation {
    pub user_id: DbId,
    pub total_reviews: i64,
    pub total_score: i64,
    pub positive_reviews: i64,
    pub negative_reviews: i64,
    pub neutral_reviews: i64,
    pub level: String,
    pub updated_at: Timestamp,
}
