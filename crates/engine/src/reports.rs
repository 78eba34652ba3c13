//! Content reports and the moderator queue that works them off.
//!
//! ```text
//!           take                 resolve | dismiss
//! pending ───────► in_progress ──────────────────► resolved | dismissed
//!    │                                                   ▲
//!    └───────────────────────────────────────────────────┘
//!                     resolve | dismiss
//! ```
//!
//! The report row is locked for each step, so two moderators cannot both
//! close the same report.

use bazaar_core::audit::{actions, audited_tables, entity_types, AuditOperation};
use bazaar_core::error::CoreError;
use bazaar_core::moderation::normalize_reason;
use bazaar_core::report::{
    ensure_actionable, validate_new_report, ReportAction, ReportStatus, ReportType,
};
use bazaar_core::roles::Permission;
use bazaar_core::search::{clamp_limit, clamp_offset};
use bazaar_core::types::{DbId, Timestamp};
use bazaar_db::models::report::{CreateReport, Report, ReportDecision};
use bazaar_db::repositories::{ListingRepo, ReportRepo, UserRepo};
use chrono::Utc;
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::EngineResult;
use crate::logging::{activity, ActivityLogger, AuditLogger};
use crate::Engine;

/// A report as submitted by a user.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: String,
    pub reported_user_id: Option<DbId>,
    pub reported_listing_id: Option<DbId>,
    pub description: String,
}

impl Engine {
    /// File a report against a user, a listing, or both. Requires
    /// `report_content`. Every named target must exist.
    pub async fn create_report(&self, reporter_id: DbId, report: NewReport) -> EngineResult<Report> {
        let report_type = ReportType::from_str(&report.report_type)?;
        validate_new_report(
            reporter_id,
            report.reported_user_id,
            report.reported_listing_id,
            &report.description,
        )?;
        let input = CreateReport {
            reporter_id,
            reported_user_id: report.reported_user_id,
            reported_listing_id: report.reported_listing_id,
            report_type: report_type.as_str().to_string(),
            description: report.description.trim().to_string(),
        };

        let mut tx = self.pool.begin().await?;
        let result = create_in(&mut tx, &input).await;
        let report = self
            .finish(tx, result, Some(reporter_id), actions::CREATE_REPORT)
            .await?;

        tracing::info!(
            report_id = report.id,
            reporter_id,
            report_type = %report.report_type,
            "Report filed"
        );
        Ok(report)
    }

    /// Take, resolve, or dismiss a report. Requires `view_reports`.
    ///
    /// A blank resolution keeps whatever text the report already carries.
    pub async fn review_report(
        &self,
        report_id: DbId,
        moderator_id: DbId,
        action: &str,
        resolution: Option<&str>,
    ) -> EngineResult<Report> {
        self.review_report_at(report_id, moderator_id, action, resolution, Utc::now())
            .await
    }

    pub async fn review_report_at(
        &self,
        report_id: DbId,
        moderator_id: DbId,
        action: &str,
        resolution: Option<&str>,
        now: Timestamp,
    ) -> EngineResult<Report> {
        let action = ReportAction::from_str(action)?;
        let resolution = normalize_reason(resolution);

        let mut tx = self.pool.begin().await?;
        let result = review_in(&mut tx, report_id, moderator_id, action, resolution, now).await;
        let report = self
            .finish(tx, result, Some(moderator_id), actions::REVIEW_REPORT)
            .await?;

        tracing::info!(
            report_id,
            moderator_id,
            action = action.as_str(),
            status = %report.status,
            "Report reviewed"
        );
        Ok(report)
    }

    /// Reports nobody has taken yet, oldest first. Requires `view_reports`.
    pub async fn pending_reports(
        &self,
        actor_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> EngineResult<Vec<Report>> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ViewReports, None)?;
        Ok(ReportRepo::list_pending(&self.pool, clamp_limit(limit), clamp_offset(offset)).await?)
    }

    /// Reports the user has filed, newest first.
    pub async fn reports_by_reporter(&self, reporter_id: DbId) -> EngineResult<Vec<Report>> {
        Ok(ReportRepo::list_by_reporter(&self.pool, reporter_id).await?)
    }
}

async fn create_in(conn: &mut PgConnection, input: &CreateReport) -> EngineResult<Report> {
    authorizer::require(conn, input.reporter_id, Permission::ReportContent, None).await?;

    if let Some(user_id) = input.reported_user_id {
        if UserRepo::find_by_id(conn, user_id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "User",
                id: user_id,
            }
            .into());
        }
    }
    if let Some(listing_id) = input.reported_listing_id {
        if ListingRepo::find_by_id(conn, listing_id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "Listing",
                id: listing_id,
            }
            .into());
        }
    }

    let report = ReportRepo::create(conn, input).await?;

    AuditLogger::record(
        conn,
        audited_tables::REPORTS,
        AuditOperation::Insert,
        report.id,
        Some(report.reporter_id),
        None,
        Some(&report),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(report.reporter_id),
            actions::CREATE_REPORT,
            entity_types::REPORT,
            report.id,
            Some(serde_json::json!({
                "report_type": report.report_type,
                "reported_user_id": report.reported_user_id,
                "reported_listing_id": report.reported_listing_id,
            })),
        ),
    )
    .await;
    Ok(report)
}

async fn review_in(
    conn: &mut PgConnection,
    report_id: DbId,
    moderator_id: DbId,
    action: ReportAction,
    resolution: Option<String>,
    now: Timestamp,
) -> EngineResult<Report> {
    authorizer::require(conn, moderator_id, Permission::ViewReports, None).await?;

    let before = ReportRepo::find_by_id_for_update(conn, report_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Report",
            id: report_id,
        })?;
    ensure_actionable(ReportStatus::from_str(&before.status)?, action)?;

    let decision = ReportDecision {
        status: action.target_status().as_str().to_string(),
        moderator_id,
        resolution: resolution.clone(),
        resolved_at: action.closes().then_some(now),
    };
    let report = ReportRepo::apply_decision(conn, report_id, &decision)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Report",
            id: report_id,
        })?;

    AuditLogger::record(
        conn,
        audited_tables::REPORTS,
        AuditOperation::Update,
        report.id,
        Some(moderator_id),
        Some(&before),
        Some(&report),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(moderator_id),
            actions::REVIEW_REPORT,
            entity_types::REPORT,
            report.id,
            Some(serde_json::json!({
                "action": action.as_str(),
                "status": report.status,
                "resolution": resolution,
            })),
        ),
    )
    .await;
    Ok(report)
}
