//! Repository for the `reviews` table.

use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::review::{CreateReview, Review, UpdateReview};

const COLUMNS: &str = "id, reviewer_id, reviewed_user_id, rating, comment, is_positive, \
                        created_at, updated_at";

pub struct ReviewRepo;

impl ReviewRepo {
    /// Insert a review.
    ///
    /// A second review for the same pair fails with a unique violation on
    /// `uq_reviews_reviewer_reviewed`.
    pub async fn create(conn: &mut PgConnection, input: &CreateReview) -> Result<Review, sqlx::Error> {
        let query = format!(
            "INSERT INTO reviews (reviewer_id, reviewed_user_id, rating, comment, is_positive)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(input.reviewer_id)
            .bind(input.reviewed_user_id)
            .bind(input.rating)
            .bind(&input.comment)
            .bind(input.is_positive)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1 FOR NO KEY UPDATE");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateReview,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!(
            "UPDATE reviews SET rating = $2, comment = $3, is_positive = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(input.rating)
            .bind(&input.comment)
            .bind(input.is_positive)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every review received by `user_id`, in id order.
    pub async fn list_for_reviewed_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE reviewed_user_id = $1 ORDER BY id");
        sqlx::query_as::<_, Review>(&query)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Reviews received by `user_id`, newest first.
    pub async fn list_received(pool: &PgPool, user_id: DbId) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reviews WHERE reviewed_user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
