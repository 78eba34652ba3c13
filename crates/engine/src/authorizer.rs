//! RBAC checks against live user rows.
//!
//! The decision itself is [`bazaar_core::roles::authorize`]; this module
//! loads the acting user and the entity owner and turns a denial into a
//! `Forbidden` error.

use bazaar_core::audit::entity_types;
use bazaar_core::error::CoreError;
use bazaar_core::roles::{authorize, authorize_owner_or_staff, Permission, Subject};
use bazaar_core::types::DbId;
use bazaar_db::models::user::User;
use bazaar_db::repositories::{ListingRepo, UserRepo};
use sqlx::PgConnection;

use crate::error::EngineResult;
use crate::Engine;

/// Load the authorizer's view of `user_id`. Unknown users yield `None`.
pub async fn load_subject(conn: &mut PgConnection, user_id: DbId) -> EngineResult<Option<Subject>> {
    Ok(UserRepo::find_by_id(conn, user_id)
        .await?
        .and_then(|user| user.subject()))
}

/// Like [`load_subject`], but locks the user row until the transaction ends,
/// so a concurrent ban cannot slip in between the check and the write.
pub async fn lock_subject(conn: &mut PgConnection, user_id: DbId) -> EngineResult<Option<Subject>> {
    Ok(UserRepo::find_by_id_for_update(conn, user_id)
        .await?
        .and_then(|user| user.subject()))
}

/// Turn a denied decision into a `Forbidden` error.
pub fn ensure(
    subject: Option<&Subject>,
    permission: Permission,
    entity_owner: Option<DbId>,
) -> Result<(), CoreError> {
    if authorize(subject, permission, entity_owner) {
        Ok(())
    } else {
        Err(forbidden(subject, permission))
    }
}

/// Like [`ensure`], but staff pass regardless of ownership.
pub fn ensure_owner_or_staff(
    subject: Option<&Subject>,
    permission: Permission,
    entity_owner: Option<DbId>,
) -> Result<(), CoreError> {
    if authorize_owner_or_staff(subject, permission, entity_owner) {
        Ok(())
    } else {
        Err(forbidden(subject, permission))
    }
}

fn forbidden(subject: Option<&Subject>, permission: Permission) -> CoreError {
    match subject {
        None => CoreError::Forbidden("Unknown user".to_string()),
        Some(s) if !s.is_active => CoreError::Forbidden("Account is inactive".to_string()),
        Some(_) => CoreError::Forbidden(format!("Permission '{}' denied", permission.as_str())),
    }
}

/// Lock the acting user's row and check `permission` in one step.
///
/// Returns the user row on success.
pub async fn require(
    conn: &mut PgConnection,
    actor_id: DbId,
    permission: Permission,
    entity_owner: Option<DbId>,
) -> EngineResult<User> {
    let user = UserRepo::find_by_id_for_update(conn, actor_id).await?;
    let subject = user.as_ref().and_then(User::subject);
    ensure(subject.as_ref(), permission, entity_owner)?;
    // `ensure` only passes for a known subject, which implies a row.
    user.ok_or_else(|| CoreError::Forbidden("Unknown user".to_string()).into())
}

impl Engine {
    /// Decide whether `user_id` holds `permission`, optionally on a specific
    /// entity. Side-effect free.
    ///
    /// Unknown permission names and unknown entities are denied.
    pub async fn check_permission(
        &self,
        user_id: DbId,
        permission: &str,
        entity_type: Option<&str>,
        entity_id: Option<DbId>,
    ) -> EngineResult<bool> {
        let Ok(permission) = Permission::from_str(permission) else {
            tracing::debug!(permission, "Unknown permission requested");
            return Ok(false);
        };

        let mut conn = self.pool.acquire().await?;
        let subject = load_subject(&mut conn, user_id).await?;

        let owner = match (entity_type, entity_id) {
            (Some(entity_types::LISTING), Some(id)) => {
                ListingRepo::find_by_id(&mut conn, id).await?.map(|l| l.owner_id)
            }
            (Some(entity_types::USER), Some(id)) => Some(id),
            _ => None,
        };

        Ok(authorize(subject.as_ref(), permission, owner))
    }
}
