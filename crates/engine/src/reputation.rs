//! Reputation engine.
//!
//! Reputation is never computed at read time: every review insert, update,
//! and delete calls [`recompute`] in the same transaction, so the stored row
//! always matches the review set as of the last committed change.

use bazaar_core::error::CoreError;
use bazaar_core::reputation::summarize;
use bazaar_core::types::DbId;
use bazaar_db::models::reputation::UserReputation;
use bazaar_db::models::review::Review;
use bazaar_db::repositories::{ReputationRepo, ReviewRepo};
use sqlx::PgConnection;

use crate::error::EngineResult;
use crate::Engine;

/// Re-derive and store the reputation of `user_id` from their received
/// reviews.
pub async fn recompute(conn: &mut PgConnection, user_id: DbId) -> EngineResult<UserReputation> {
    ReputationRepo::lock(conn, user_id).await?;
    let reviews = ReviewRepo::list_for_reviewed_user(conn, user_id).await?;
    let summary = summarize(reviews.iter().map(Review::sample));
    let reputation = ReputationRepo::upsert(conn, user_id, &summary).await?;
    tracing::debug!(
        user_id,
        total_reviews = summary.total_reviews,
        level = summary.level.as_str(),
        "Reputation recomputed"
    );
    Ok(reputation)
}

impl Engine {
    pub async fn reputation(&self, user_id: DbId) -> EngineResult<UserReputation> {
        ReputationRepo::find(&self.pool, user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "UserReputation",
                    id: user_id,
                }
                .into()
            })
    }
}
