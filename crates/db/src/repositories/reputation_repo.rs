//! Repository for the derived `user_reputations` table.

use bazaar_core::reputation::ReputationSummary;
use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::reputation::UserReputation;

const COLUMNS: &str = "user_id, total_reviews, total_score, positive_reviews, negative_reviews, \
                        neutral_reviews, level, updated_at";

pub struct ReputationRepo;

impl ReputationRepo {
    /// Make sure the row exists and lock it before reading the review set.
    pub async fn lock(conn: &mut PgConnection, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_reputations (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        sqlx::query("SELECT 1 FROM user_reputations WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Insert or overwrite every derived field for `user_id`.
    pub async fn upsert(
        conn: &mut PgConnection,
        user_id: DbId,
        summary: &ReputationSummary,
    ) -> Result<UserReputation, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_reputations
                (user_id, total_reviews, total_score, positive_reviews,
                 negative_reviews, neutral_reviews, level, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             ON CONFLICT (user_id) DO UPDATE SET
                total_reviews = EXCLUDED.total_reviews,
                total_score = EXCLUDED.total_score,
                positive_reviews = EXCLUDED.positive_reviews,
                negative_reviews = EXCLUDED.negative_reviews,
                neutral_reviews = EXCLUDED.neutral_reviews,
                level = EXCLUDED.level,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserReputation>(&query)
            .bind(user_id)
            .bind(summary.total_reviews)
            .bind(summary.total_score)
            .bind(summary.positive_reviews)
            .bind(summary.negative_reviews)
            .bind(summary.neutral_reviews)
            .bind(summary.level.as_str())
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find(pool: &PgPool, user_id: DbId) -> Result<Option<UserReputation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_reputations WHERE user_id = $1");
        sqlx::query_as::<_, UserReputation>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
