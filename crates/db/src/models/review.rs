//! Review entity model and DTOs.

use bazaar_core::reputation::ReviewSample;
use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `reviews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub reviewer_id: DbId,
    pub reviewed_user_id: DbId,
    pub rating: i32,
    pub comment: String,
    pub is_positive: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Review {
    pub fn sample(&self) -> ReviewSample {
        ReviewSample {
            rating: self.rating,
            is_positive: self.is_positive,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub reviewer_id: DbId,
    pub reviewed_user_id: DbId,
    pub rating: i32,
    pub comment: String,
    pub is_positive: bool,
}

/// New rating and comment for an existing review. `is_positive` follows
/// the rating.
#[derive(Debug, Clone)]
pub struct UpdateReview {
    pub rating: i32,
    pub comment: String,
    pub is_positive: bool,
}
