//! User entity model and DTOs.

use bazaar_core::roles::{Role, Subject};
use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Serialized only into audit snapshots, which redact `password_hash`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub phone: Option<String>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The authorizer's view of this user.
    ///
    /// A role string the enum does not know yields `None`, which the
    /// authorizer treats like an unknown user.
    pub fn subject(&self) -> Option<Subject> {
        let role = Role::from_str(&self.role).ok()?;
        Some(Subject {
            user_id: self.id,
            role,
            is_active: self.is_active,
        })
    }
}

/// DTO for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
}
