//! Repository for the `notifications` table.

use bazaar_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{CreateNotification, Notification};

const COLUMNS: &str = "id, user_id, kind, title, content, related_entity_type, \
                        related_entity_id, is_read, read_at, created_at";

pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications
                (user_id, kind, title, content, related_entity_type, related_entity_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.title)
            .bind(&input.content)
            .bind(&input.related_entity_type)
            .bind(input.related_entity_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// List notifications for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark one notification read, scoped to its recipient.
    ///
    /// Returns `true` if an unread notification was updated.
    pub async fn mark_read(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread notification for a user read. Returns the count.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Delete read notifications created before `cutoff`. Unread ones are kept.
    pub async fn delete_read_before(
        conn: &mut PgConnection,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1")
                .bind(cutoff)
                .execute(&mut *conn)
                .await?;
        Ok(result.rows_affected())
    }
}
