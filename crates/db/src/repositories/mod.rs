//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods used inside an engine operation take `&mut PgConnection` so the
//! caller's transaction covers them; pure read paths take `&PgPool`.

pub mod activity_repo;
pub mod audit_repo;
pub mod category_repo;
pub mod favorite_repo;
pub mod listing_repo;
pub mod login_attempt_repo;
pub mod moderation_repo;
pub mod notification_repo;
pub mod report_repo;
pub mod reputation_repo;
pub mod review_repo;
pub mod statistics_repo;
pub mod user_repo;

pub use activity_repo::ActivityLogRepo;
pub use audit_repo::AuditLogRepo;
pub use category_repo::CategoryRepo;
pub use favorite_repo::FavoriteRepo;
pub use listing_repo::ListingRepo;
pub use login_attempt_repo::LoginAttemptRepo;
pub use moderation_repo::ModerationRepo;
pub use notification_repo::NotificationRepo;
pub use report_repo::ReportRepo;
pub use reputation_repo::ReputationRepo;
pub use review_repo::ReviewRepo;
pub use statistics_repo::StatisticsRepo;
pub use user_repo::UserRepo;
