//! Repository for the `listing_moderations` table.

use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::moderation::{CreateListingModeration, ListingModeration};

const COLUMNS: &str = "id, listing_id, moderator_id, action, reason, created_at";

pub struct ModerationRepo;

impl ModerationRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateListingModeration,
    ) -> Result<ListingModeration, sqlx::Error> {
        let query = format!(
            "INSERT INTO listing_moderations (listing_id, moderator_id, action, reason)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ListingModeration>(&query)
            .bind(input.listing_id)
            .bind(input.moderator_id)
            .bind(&input.action)
            .bind(&input.reason)
            .fetch_one(&mut *conn)
            .await
    }

    /// Decisions on one listing, oldest first.
    pub async fn list_for_listing(
        pool: &PgPool,
        listing_id: DbId,
    ) -> Result<Vec<ListingModeration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM listing_moderations WHERE listing_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, ListingModeration>(&query)
            .bind(listing_id)
            .fetch_all(pool)
            .await
    }
}
