//! Per-source failed login counter.

use bazaar_core::login_guard::AttemptState;
use bazaar_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `failed_login_attempts` table, keyed by source address.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FailedLoginAttempt {
    pub source_address: String,
    pub username: Option<String>,
    pub attempt_count: i32,
    pub last_attempt_at: Timestamp,
    pub blocked: bool,
    pub blocked_until: Option<Timestamp>,
}

impl FailedLoginAttempt {
    pub fn state(&self) -> AttemptState {
        AttemptState {
            attempt_count: self.attempt_count,
            last_attempt_at: self.last_attempt_at,
            blocked: self.blocked,
            blocked_until: self.blocked_until,
        }
    }
}
