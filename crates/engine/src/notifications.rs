//! Notification dispatch and the recipient-facing read side.

use bazaar_core::notification::{
    listing_message, review_message, ListingEvent, NotificationKind, NotificationText,
};
use bazaar_core::roles::Permission;
use bazaar_core::search::{clamp_limit, clamp_offset};
use bazaar_core::types::DbId;
use bazaar_db::models::listing::Listing;
use bazaar_db::models::notification::{CreateNotification, Notification};
use bazaar_db::models::review::Review;
use bazaar_db::repositories::NotificationRepo;
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::EngineResult;
use crate::Engine;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Creates exactly one notification row per qualifying event, inside the
/// caller's transaction.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Notify a listing's owner about a lifecycle event.
    pub async fn listing_event(
        conn: &mut PgConnection,
        listing: &Listing,
        event: ListingEvent<'_>,
    ) -> EngineResult<Notification> {
        let text = listing_message(event, &listing.title);
        Self::insert(conn, listing.owner_id, event.kind(), listing.id, text).await
    }

    /// Notify the reviewed user about a new review.
    pub async fn new_review(
        conn: &mut PgConnection,
        review: &Review,
        reviewer_name: &str,
    ) -> EngineResult<Notification> {
        let text = review_message(reviewer_name, review.rating);
        Self::insert(
            conn,
            review.reviewed_user_id,
            NotificationKind::NewReview,
            review.id,
            text,
        )
        .await
    }

    async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        kind: NotificationKind,
        entity_id: DbId,
        text: NotificationText,
    ) -> EngineResult<Notification> {
        let notification = NotificationRepo::create(
            conn,
            &CreateNotification {
                user_id,
                kind: kind.as_str().to_string(),
                title: text.title,
                content: text.content,
                related_entity_type: Some(kind.entity_type().to_string()),
                related_entity_id: Some(entity_id),
            },
        )
        .await?;
        tracing::debug!(
            notification_id = notification.id,
            user_id,
            kind = kind.as_str(),
            "Notification created"
        );
        Ok(notification)
    }
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

impl Engine {
    /// Notifications addressed to `user_id`, newest first.
    pub async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> EngineResult<Vec<Notification>> {
        self.ensure_can_read_notifications(user_id).await?;
        Ok(NotificationRepo::list_for_user(
            &self.pool,
            user_id,
            unread_only,
            clamp_limit(limit),
            clamp_offset(offset),
        )
        .await?)
    }

    /// Mark one of the user's notifications read. Returns `false` if it was
    /// already read or is not theirs.
    pub async fn mark_notification_read(
        &self,
        user_id: DbId,
        notification_id: DbId,
    ) -> EngineResult<bool> {
        self.ensure_can_read_notifications(user_id).await?;
        Ok(NotificationRepo::mark_read(&self.pool, notification_id, user_id).await?)
    }

    pub async fn mark_all_notifications_read(&self, user_id: DbId) -> EngineResult<u64> {
        self.ensure_can_read_notifications(user_id).await?;
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id).await?)
    }

    pub async fn unread_notification_count(&self, user_id: DbId) -> EngineResult<i64> {
        self.ensure_can_read_notifications(user_id).await?;
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn ensure_can_read_notifications(&self, user_id: DbId) -> EngineResult<()> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, user_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ViewOwnNotifications, None)?;
        Ok(())
    }
}
