//! Statistics aggregator.

use bazaar_core::error::CoreError;
use bazaar_core::types::DbId;
use bazaar_db::models::statistics::UserStatistics;
use bazaar_db::repositories::StatisticsRepo;
use sqlx::PgConnection;

use crate::error::EngineResult;
use crate::Engine;

/// Recompute an owner's listing counters from scratch.
///
/// Called after every listing mutation that affects `user_id`, inside the
/// same transaction.
pub async fn refresh(conn: &mut PgConnection, user_id: DbId) -> EngineResult<UserStatistics> {
    StatisticsRepo::lock(conn, user_id).await?;
    let stats = StatisticsRepo::recompute(conn, user_id).await?;
    tracing::debug!(
        user_id,
        listings_count = stats.listings_count,
        sold_count = stats.sold_count,
        "Statistics recomputed"
    );
    Ok(stats)
}

impl Engine {
    pub async fn user_statistics(&self, user_id: DbId) -> EngineResult<UserStatistics> {
        StatisticsRepo::find(&self.pool, user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "UserStatistics",
                    id: user_id,
                }
                .into()
            })
    }
}
