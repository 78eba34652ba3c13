//! Repository for the `user_favorites` join table.

use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

pub struct FavoriteRepo;

impl FavoriteRepo {
    /// Add a favorite. Returns `false` if it already existed.
    pub async fn add(
        conn: &mut PgConnection,
        user_id: DbId,
        listing_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_favorites (user_id, listing_id) VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_user_favorites_user_listing DO NOTHING",
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a favorite. Returns `false` if there was none.
    pub async fn remove(
        conn: &mut PgConnection,
        user_id: DbId,
        listing_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND listing_id = $2")
                .bind(user_id)
                .bind(listing_id)
                .execute(&mut *conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Listing ids a user has favorited, most recent first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT listing_id FROM user_favorites WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
