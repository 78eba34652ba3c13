//! Repository for the `failed_login_attempts` table.

use bazaar_core::login_guard::AttemptState;
use bazaar_core::types::Timestamp;
use sqlx::{PgConnection, PgPool};

use crate::models::login_attempt::FailedLoginAttempt;

const COLUMNS: &str =
    "source_address, username, attempt_count, last_attempt_at, blocked, blocked_until";

pub struct LoginAttemptRepo;

impl LoginAttemptRepo {
    pub async fn find(
        pool: &PgPool,
        source_address: &str,
    ) -> Result<Option<FailedLoginAttempt>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM failed_login_attempts WHERE source_address = $1");
        sqlx::query_as::<_, FailedLoginAttempt>(&query)
            .bind(source_address)
            .fetch_optional(pool)
            .await
    }

    /// Ensure a record exists for `source_address` and lock it.
    ///
    /// Concurrent failures from one source queue on this row lock, so each
    /// read-compute-write cycle sees the previous one's result. A freshly
    /// created record has a zero count.
    pub async fn lock_or_create(
        conn: &mut PgConnection,
        source_address: &str,
        now: Timestamp,
    ) -> Result<FailedLoginAttempt, sqlx::Error> {
        sqlx::query(
            "INSERT INTO failed_login_attempts (source_address, attempt_count, last_attempt_at)
             VALUES ($1, 0, $2)
             ON CONFLICT (source_address) DO NOTHING",
        )
        .bind(source_address)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM failed_login_attempts WHERE source_address = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, FailedLoginAttempt>(&query)
            .bind(source_address)
            .fetch_one(&mut *conn)
            .await
    }

    /// Store the state computed for a locked record.
    pub async fn save(
        conn: &mut PgConnection,
        source_address: &str,
        username: Option<&str>,
        state: &AttemptState,
    ) -> Result<FailedLoginAttempt, sqlx::Error> {
        let query = format!(
            "UPDATE failed_login_attempts SET
                username = COALESCE($2, username),
                attempt_count = $3,
                last_attempt_at = $4,
                blocked = $5,
                blocked_until = $6
             WHERE source_address = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FailedLoginAttempt>(&query)
            .bind(source_address)
            .bind(username)
            .bind(state.attempt_count)
            .bind(state.last_attempt_at)
            .bind(state.blocked)
            .bind(state.blocked_until)
            .fetch_one(&mut *conn)
            .await
    }

    /// Forget a source after a successful login.
    pub async fn clear(conn: &mut PgConnection, source_address: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM failed_login_attempts WHERE source_address = $1")
            .bind(source_address)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop records idle since before `cutoff` unless their block is still
    /// running at `now`.
    pub async fn delete_stale(
        conn: &mut PgConnection,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM failed_login_attempts
             WHERE last_attempt_at < $1
               AND NOT (blocked AND blocked_until IS NOT NULL AND blocked_until > $2)",
        )
        .bind(cutoff)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
