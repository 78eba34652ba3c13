//! Repository for the append-only `user_activity_log` table.

use bazaar_core::search::{clamp_limit, clamp_offset};
use bazaar_core::types::Timestamp;
use sqlx::{PgConnection, PgPool};

use crate::models::activity::{ActivityLogEntry, ActivityQuery, CreateActivityLogEntry};

const COLUMNS: &str = "id, user_id, action, entity_type, entity_id, details, \
                        ip_address, user_agent, created_at";

pub struct ActivityLogRepo;

impl ActivityLogRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        entry: &CreateActivityLogEntry,
    ) -> Result<ActivityLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_activity_log
                (user_id, action, entity_type, entity_id, details, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityLogEntry>(&query)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.details)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .fetch_one(&mut *conn)
            .await
    }

    /// Query activity with optional filters, newest first.
    ///
    /// Unset filters are passed as NULL and match everything.
    pub async fn query(
        pool: &PgPool,
        params: &ActivityQuery,
    ) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_activity_log
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR action = $2)
               AND ($3::TEXT IS NULL OR entity_type = $3)
               AND ($4::BIGINT IS NULL OR entity_id = $4)
               AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
               AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
             ORDER BY created_at DESC, id DESC
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, ActivityLogEntry>(&query)
            .bind(params.user_id)
            .bind(&params.action)
            .bind(&params.entity_type)
            .bind(params.entity_id)
            .bind(params.from)
            .bind(params.to)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Retention cleanup. Returns the number of entries removed.
    pub async fn delete_before(
        conn: &mut PgConnection,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_activity_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
