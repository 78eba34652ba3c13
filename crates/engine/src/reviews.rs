//! Reviews between users.
//!
//! Each write recomputes the reviewed user's reputation inside the same
//! transaction, so the stored aggregate never lags the review set.

use bazaar_core::audit::{actions, audited_tables, entity_types, AuditOperation};
use bazaar_core::error::CoreError;
use bazaar_core::review::{is_positive, validate_comment, validate_new_review, validate_rating};
use bazaar_core::roles::Permission;
use bazaar_core::types::DbId;
use bazaar_db::models::review::{CreateReview, Review, UpdateReview};
use bazaar_db::repositories::{ReviewRepo, UserRepo};
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::{conflict_on, EngineResult};
use crate::logging::{activity, ActivityLogger, AuditLogger};
use crate::notifications::NotificationDispatcher;
use crate::reputation;
use crate::Engine;

fn review_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Review",
        id,
    }
}

impl Engine {
    /// Leave a review. One review per (reviewer, reviewed) pair.
    pub async fn create_review(
        &self,
        reviewer_id: DbId,
        reviewed_user_id: DbId,
        rating: i32,
        comment: &str,
    ) -> EngineResult<Review> {
        validate_new_review(reviewer_id, reviewed_user_id, rating, comment)?;
        let input = CreateReview {
            reviewer_id,
            reviewed_user_id,
            rating,
            comment: comment.trim().to_string(),
            is_positive: is_positive(rating),
        };

        let mut tx = self.pool.begin().await?;
        let result = create_in(&mut tx, &input).await;
        let review = self
            .finish(tx, result, Some(reviewer_id), actions::CREATE_REVIEW)
            .await?;

        tracing::info!(
            review_id = review.id,
            reviewer_id,
            reviewed_user_id,
            rating,
            "Review created"
        );
        Ok(review)
    }

    /// Change the rating and/or comment of one's own review.
    pub async fn update_review(
        &self,
        review_id: DbId,
        reviewer_id: DbId,
        rating: Option<i32>,
        comment: Option<&str>,
    ) -> EngineResult<Review> {
        if let Some(rating) = rating {
            validate_rating(rating)?;
        }
        if let Some(comment) = comment {
            validate_comment(comment)?;
        }

        let mut tx = self.pool.begin().await?;
        let result = update_in(&mut tx, review_id, reviewer_id, rating, comment).await;
        let review = self
            .finish(tx, result, Some(reviewer_id), actions::UPDATE_REVIEW)
            .await?;

        tracing::info!(review_id, reviewer_id, rating = review.rating, "Review updated");
        Ok(review)
    }

    /// Remove a review. The author or any moderator/admin may do so.
    pub async fn delete_review(&self, review_id: DbId, actor_id: DbId) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = delete_in(&mut tx, review_id, actor_id).await;
        self.finish(tx, result, Some(actor_id), actions::DELETE_REVIEW)
            .await?;

        tracing::info!(review_id, actor_id, "Review deleted");
        Ok(())
    }

    /// Reviews received by a user, newest first.
    pub async fn reviews_for_user(&self, user_id: DbId) -> EngineResult<Vec<Review>> {
        Ok(ReviewRepo::list_received(&self.pool, user_id).await?)
    }
}

async fn create_in(conn: &mut PgConnection, input: &CreateReview) -> EngineResult<Review> {
    let reviewer =
        authorizer::require(conn, input.reviewer_id, Permission::LeaveReview, None).await?;
    // A banned account counts as missing.
    let reviewed = UserRepo::find_by_id(conn, input.reviewed_user_id).await?;
    if !reviewed.is_some_and(|u| u.is_active) {
        return Err(CoreError::NotFound {
            entity: "User",
            id: input.reviewed_user_id,
        }
        .into());
    }

    let review = ReviewRepo::create(conn, input).await.map_err(conflict_on(
        "uq_reviews_reviewer_reviewed",
        "You have already reviewed this user",
    ))?;
    reputation::recompute(conn, review.reviewed_user_id).await?;
    NotificationDispatcher::new_review(conn, &review, &reviewer.username).await?;

    AuditLogger::record(
        conn,
        audited_tables::REVIEWS,
        AuditOperation::Insert,
        review.id,
        Some(review.reviewer_id),
        None,
        Some(&review),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(review.reviewer_id),
            actions::CREATE_REVIEW,
            entity_types::REVIEW,
            review.id,
            Some(serde_json::json!({
                "reviewed_user_id": review.reviewed_user_id,
                "rating": review.rating,
            })),
        ),
    )
    .await;
    Ok(review)
}

async fn update_in(
    conn: &mut PgConnection,
    review_id: DbId,
    reviewer_id: DbId,
    rating: Option<i32>,
    comment: Option<&str>,
) -> EngineResult<Review> {
    let actor = authorizer::lock_subject(conn, reviewer_id).await?;
    let before = lock_review(conn, review_id).await?;
    authorizer::ensure(actor.as_ref(), Permission::LeaveReview, None)?;
    if before.reviewer_id != reviewer_id {
        return Err(CoreError::Forbidden("Only the author can edit a review".into()).into());
    }

    let rating = rating.unwrap_or(before.rating);
    let changes = UpdateReview {
        rating,
        comment: comment.map_or_else(|| before.comment.clone(), |c| c.trim().to_string()),
        is_positive: is_positive(rating),
    };
    let after = ReviewRepo::update(conn, review_id, &changes)
        .await?
        .ok_or_else(|| review_not_found(review_id))?;
    reputation::recompute(conn, after.reviewed_user_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::REVIEWS,
        AuditOperation::Update,
        after.id,
        Some(reviewer_id),
        Some(&before),
        Some(&after),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(reviewer_id),
            actions::UPDATE_REVIEW,
            entity_types::REVIEW,
            after.id,
            Some(serde_json::json!({ "rating": after.rating })),
        ),
    )
    .await;
    Ok(after)
}

async fn delete_in(conn: &mut PgConnection, review_id: DbId, actor_id: DbId) -> EngineResult<()> {
    let actor = authorizer::lock_subject(conn, actor_id).await?;
    let review = lock_review(conn, review_id).await?;
    authorizer::ensure(actor.as_ref(), Permission::LeaveReview, None)?;
    let is_staff = actor.is_some_and(|s| s.role.is_staff());
    if review.reviewer_id != actor_id && !is_staff {
        return Err(CoreError::Forbidden(
            "Only the author or a moderator can delete a review".into(),
        )
        .into());
    }

    if !ReviewRepo::delete(conn, review_id).await? {
        return Err(review_not_found(review_id).into());
    }
    reputation::recompute(conn, review.reviewed_user_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::REVIEWS,
        AuditOperation::Delete,
        review.id,
        Some(actor_id),
        Some(&review),
        None,
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::DELETE_REVIEW,
            entity_types::REVIEW,
            review.id,
            Some(serde_json::json!({ "reviewed_user_id": review.reviewed_user_id })),
        ),
    )
    .await;
    Ok(())
}

async fn lock_review(conn: &mut PgConnection, review_id: DbId) -> EngineResult<Review> {
    ReviewRepo::find_by_id_for_update(conn, review_id)
        .await?
        .ok_or_else(|| review_not_found(review_id).into())
}
