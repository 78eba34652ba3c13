//! Moderation workflow and time-based expiry.
//!
//! ```text
//!            approve
//! pending ───────────► active ──► sold | expired
//!    │
//!    └─────────────► rejected
//!            reject
//! ```
//!
//! Only `pending` listings accept a decision. The listing row is locked for
//! the decision, so of two concurrent moderators the second one sees the
//! new status and fails with `InvalidState`.

use std::collections::BTreeSet;

use bazaar_core::audit::{actions, audited_tables, entity_types, AuditOperation};
use bazaar_core::error::CoreError;
use bazaar_core::listing::{ListingStatus, STATUS_ACTIVE};
use bazaar_core::moderation::{ensure_moderatable, normalize_reason, ModerationAction};
use bazaar_core::notification::ListingEvent;
use bazaar_core::roles::Permission;
use bazaar_core::search::{clamp_limit, clamp_offset};
use bazaar_core::types::{DbId, Timestamp};
use bazaar_db::models::listing::Listing;
use bazaar_db::models::moderation::{CreateListingModeration, ListingModeration};
use bazaar_db::repositories::{ListingRepo, ModerationRepo};
use chrono::{Duration, Utc};
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::EngineResult;
use crate::logging::{activity, ActivityLogger, AuditLogger};
use crate::notifications::NotificationDispatcher;
use crate::statistics;
use crate::Engine;

/// Result of a committed moderation decision.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub listing: Listing,
    pub decision: ListingModeration,
}

impl Engine {
    /// Approve or reject a pending listing. Requires `moderate_listings`.
    ///
    /// `action` is `"approve"` or `"reject"`. A blank reason is stored as
    /// none; a rejection reason is passed on to the owner.
    pub async fn moderate_listing(
        &self,
        listing_id: DbId,
        moderator_id: DbId,
        action: &str,
        reason: Option<&str>,
    ) -> EngineResult<ModerationOutcome> {
        self.moderate_listing_at(listing_id, moderator_id, action, reason, Utc::now())
            .await
    }

    pub async fn moderate_listing_at(
        &self,
        listing_id: DbId,
        moderator_id: DbId,
        action: &str,
        reason: Option<&str>,
        now: Timestamp,
    ) -> EngineResult<ModerationOutcome> {
        let action = ModerationAction::from_str(action)?;
        let reason = normalize_reason(reason);

        let mut tx = self.pool.begin().await?;
        let result = moderate_in(&mut tx, listing_id, moderator_id, action, reason, now).await;
        let outcome = self
            .finish(tx, result, Some(moderator_id), actions::MODERATE_LISTING)
            .await?;

        tracing::info!(
            listing_id,
            moderator_id,
            action = action.as_str(),
            status = %outcome.listing.status,
            "Listing moderated"
        );
        Ok(outcome)
    }

    /// Listings awaiting a decision, oldest first.
    pub async fn pending_queue(
        &self,
        actor_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> EngineResult<Vec<Listing>> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ModerateListings, None)?;
        Ok(ListingRepo::list_pending(&self.pool, clamp_limit(limit), clamp_offset(offset)).await?)
    }

    /// Every decision taken on a listing. Requires `view_moderation_log`.
    pub async fn moderation_history(
        &self,
        actor_id: DbId,
        listing_id: DbId,
    ) -> EngineResult<Vec<ListingModeration>> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ViewModerationLog, None)?;
        Ok(ModerationRepo::list_for_listing(&self.pool, listing_id).await?)
    }

    /// Expire active listings that are past their `expires_at` or older than
    /// the configured maximum age. Returns how many were expired.
    ///
    /// Works in batches of `expiry_batch_size`, one transaction per batch.
    /// Safe to run concurrently: rows another sweep holds are skipped.
    pub async fn expire_listings(&self) -> EngineResult<u64> {
        self.expire_listings_at(Utc::now()).await
    }

    pub async fn expire_listings_at(&self, now: Timestamp) -> EngineResult<u64> {
        let published_before = now - Duration::days(self.config.listing_max_age_days);
        let batch_size = self.config.expiry_batch_size.max(1);

        let mut total: u64 = 0;
        loop {
            let mut tx = self.pool.begin().await?;
            let result = expire_batch_in(&mut tx, now, published_before, batch_size).await;
            let expired = self
                .finish(tx, result, None, actions::EXPIRE_LISTING)
                .await?;
            total += expired as u64;
            if (expired as i64) < batch_size {
                break;
            }
        }

        if total > 0 {
            tracing::info!(expired = total, "Listings expired");
        }
        Ok(total)
    }
}

async fn moderate_in(
    conn: &mut PgConnection,
    listing_id: DbId,
    moderator_id: DbId,
    action: ModerationAction,
    reason: Option<String>,
    now: Timestamp,
) -> EngineResult<ModerationOutcome> {
    authorizer::require(conn, moderator_id, Permission::ModerateListings, None).await?;

    let before = ListingRepo::find_by_id_for_update(conn, listing_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Listing",
            id: listing_id,
        })?;
    ensure_moderatable(ListingStatus::from_str(&before.status)?)?;

    let listing =
        ListingRepo::transition_from_pending(conn, listing_id, action.target_status().as_str(), now)
            .await?
            .ok_or_else(|| {
                CoreError::InvalidState(format!("Listing {listing_id} is no longer pending"))
            })?;

    let decision = ModerationRepo::create(
        conn,
        &CreateListingModeration {
            listing_id,
            moderator_id,
            action: action.as_str().to_string(),
            reason: reason.clone(),
        },
    )
    .await?;

    NotificationDispatcher::listing_event(conn, &listing, action.listing_event(reason.as_deref()))
        .await?;
    statistics::refresh(conn, listing.owner_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::LISTINGS,
        AuditOperation::Update,
        listing.id,
        Some(moderator_id),
        Some(&before),
        Some(&listing),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(moderator_id),
            actions::MODERATE_LISTING,
            entity_types::LISTING,
            listing.id,
            Some(serde_json::json!({ "action": action.as_str(), "reason": reason })),
        ),
    )
    .await;

    Ok(ModerationOutcome { listing, decision })
}

async fn expire_batch_in(
    conn: &mut PgConnection,
    now: Timestamp,
    published_before: Timestamp,
    batch_size: i64,
) -> EngineResult<usize> {
    let expired = ListingRepo::expire_due(conn, now, published_before, batch_size).await?;

    // Statistics rows before the audit chain lock, the same order every
    // listing writer takes them in.
    let owners: BTreeSet<DbId> = expired.iter().map(|l| l.owner_id).collect();
    for owner_id in owners {
        statistics::refresh(conn, owner_id).await?;
    }

    for listing in &expired {
        NotificationDispatcher::listing_event(conn, listing, ListingEvent::Expired).await?;

        // Only active listings are swept, so the prior state differs in
        // status alone.
        let before = Listing {
            status: STATUS_ACTIVE.to_string(),
            ..listing.clone()
        };
        AuditLogger::record(
            conn,
            audited_tables::LISTINGS,
            AuditOperation::Update,
            listing.id,
            None,
            Some(&before),
            Some(listing),
        )
        .await;
        ActivityLogger::record(
            conn,
            activity(
                None,
                actions::EXPIRE_LISTING,
                entity_types::LISTING,
                listing.id,
                Some(serde_json::json!({ "owner_id": listing.owner_id })),
            ),
        )
        .await;
    }
    Ok(expired.len())
}
