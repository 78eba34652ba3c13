//! Listing category model and DTO.

use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<DbId>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<DbId>,
    pub sort_order: i32,
}
