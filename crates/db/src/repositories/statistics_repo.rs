//! Repository for the derived `user_statistics` table.

use bazaar_core::listing::{COUNTED_STATUSES, STATUS_SOLD};
use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::statistics::UserStatistics;

const COLUMNS: &str = "user_id, listings_count, sold_count, total_earnings, updated_at";

pub struct StatisticsRepo;

impl StatisticsRepo {
    /// Make sure the row exists and lock it.
    ///
    /// Taken before [`Self::recompute`] so the aggregate query runs after any
    /// concurrent recompute for the same user has committed.
    pub async fn lock(conn: &mut PgConnection, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_statistics (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        sqlx::query("SELECT 1 FROM user_statistics WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Re-derive every counter for `user_id` from the `listings` table and
    /// store the result.
    pub async fn recompute(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<UserStatistics, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_statistics (user_id, listings_count, sold_count, total_earnings, updated_at)
             SELECT $1,
                    COUNT(*) FILTER (WHERE status = ANY($2)),
                    COUNT(*) FILTER (WHERE status = '{STATUS_SOLD}'),
                    COALESCE(SUM(price) FILTER (WHERE status = '{STATUS_SOLD}'), 0)::BIGINT,
                    NOW()
             FROM listings WHERE owner_id = $1
             ON CONFLICT (user_id) DO UPDATE SET
                listings_count = EXCLUDED.listings_count,
                sold_count = EXCLUDED.sold_count,
                total_earnings = EXCLUDED.total_earnings,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserStatistics>(&query)
            .bind(user_id)
            .bind(COUNTED_STATUSES)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find(pool: &PgPool, user_id: DbId) -> Result<Option<UserStatistics>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_statistics WHERE user_id = $1");
        sqlx::query_as::<_, UserStatistics>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
