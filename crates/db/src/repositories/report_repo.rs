//! Repository for the `reports` table.

use bazaar_core::report::STATUS_PENDING;
use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::report::{CreateReport, Report, ReportDecision};

const COLUMNS: &str = "id, reporter_id, reported_user_id, reported_listing_id, report_type, \
                       description, status, moderator_id, resolution, created_at, resolved_at";

pub struct ReportRepo;

impl ReportRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateReport,
    ) -> Result<Report, sqlx::Error> {
        let query = format!(
            "INSERT INTO reports (reporter_id, reported_user_id, reported_listing_id, report_type, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(input.reporter_id)
            .bind(input.reported_user_id)
            .bind(input.reported_listing_id)
            .bind(&input.report_type)
            .bind(&input.description)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a report and lock its row until the transaction ends.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Report>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reports WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Apply a moderator's step. A `None` resolution keeps the stored text.
    pub async fn apply_decision(
        conn: &mut PgConnection,
        id: DbId,
        decision: &ReportDecision,
    ) -> Result<Option<Report>, sqlx::Error> {
        let query = format!(
            "UPDATE reports SET
                status = $2,
                moderator_id = $3,
                resolution = COALESCE($4, resolution),
                resolved_at = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .bind(&decision.status)
            .bind(decision.moderator_id)
            .bind(&decision.resolution)
            .bind(decision.resolved_at)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Pending reports, oldest first.
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports WHERE status = '{STATUS_PENDING}'
             ORDER BY created_at ASC, id ASC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Reports filed by one user, newest first.
    pub async fn list_by_reporter(
        pool: &PgPool,
        reporter_id: DbId,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports WHERE reporter_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(reporter_id)
            .fetch_all(pool)
            .await
    }
}
