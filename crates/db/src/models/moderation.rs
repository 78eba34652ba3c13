//! Moderation decision records.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `listing_moderations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ListingModeration {
    pub id: DbId,
    pub listing_id: DbId,
    pub moderator_id: DbId,
    pub action: String,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateListingModeration {
    pub listing_id: DbId,
    pub moderator_id: DbId,
    pub action: String,
    pub reason: Option<String>,
}
