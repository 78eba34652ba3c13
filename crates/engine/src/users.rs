//! Account registration and administration.

use bazaar_core::audit::{actions, audited_tables, entity_types, AuditOperation};
use bazaar_core::error::CoreError;
use bazaar_core::reputation::ReputationSummary;
use bazaar_core::roles::{Permission, Role};
use bazaar_core::types::DbId;
use bazaar_db::models::user::{CreateUser, User};
use bazaar_db::repositories::{ReputationRepo, UserRepo};
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::{conflict_on, EngineError, EngineResult};
use crate::logging::{activity, ActivityLogger, AuditLogger};
use crate::password::{hash_password, validate_password_strength};
use crate::statistics;
use crate::Engine;

pub const MAX_USERNAME_LEN: usize = 150;

fn validate_registration(username: &str, email: &str) -> Result<(), CoreError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CoreError::Validation("Username must not be empty".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(CoreError::Validation(format!("Invalid email address: '{email}'"))),
    }
}

impl Engine {
    /// Sign up a new account with the `user` role.
    ///
    /// The new user starts with an empty `newbie` reputation and zeroed
    /// statistics so readers never see a missing row. Elevated roles are
    /// granted afterwards through [`Engine::set_user_role`] or at creation
    /// time through [`Engine::create_user`].
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> EngineResult<User> {
        let input = self.prepare_account(username, email, password, Role::User)?;

        let mut tx = self.pool.begin().await?;
        let result = register_in(&mut tx, &input, None).await;
        let user = self.finish(tx, result, None, actions::REGISTER).await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Create an account with any role on behalf of an administrator.
    /// Requires `manage_users`.
    pub async fn create_user(
        &self,
        actor_id: DbId,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> EngineResult<User> {
        let role = Role::from_str(role)?;
        let input = self.prepare_account(username, email, password, role)?;

        let mut tx = self.pool.begin().await?;
        let result = create_in(&mut tx, actor_id, &input).await;
        let user = self
            .finish(tx, result, Some(actor_id), actions::REGISTER)
            .await?;

        tracing::info!(
            actor_id,
            user_id = user.id,
            username = %user.username,
            role = %user.role,
            "User created"
        );
        Ok(user)
    }

    fn prepare_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> EngineResult<CreateUser> {
        validate_registration(username, email)?;
        validate_password_strength(password, self.config.min_password_length)?;
        Ok(CreateUser {
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password)?,
            role: role.as_str().to_string(),
            phone: None,
        })
    }

    /// Ban or unban an account. Requires `ban_users`.
    pub async fn set_user_active(
        &self,
        actor_id: DbId,
        user_id: DbId,
        is_active: bool,
    ) -> EngineResult<User> {
        let mut tx = self.pool.begin().await?;
        let result = set_active_in(&mut tx, actor_id, user_id, is_active).await;
        let user = self
            .finish(tx, result, Some(actor_id), actions::UPDATE_USER)
            .await?;

        tracing::info!(actor_id, user_id, is_active, "User activation changed");
        Ok(user)
    }

    /// Change an account's role. Requires `manage_users`.
    pub async fn set_user_role(
        &self,
        actor_id: DbId,
        user_id: DbId,
        role: &str,
    ) -> EngineResult<User> {
        let role = Role::from_str(role)?;

        let mut tx = self.pool.begin().await?;
        let result = set_role_in(&mut tx, actor_id, user_id, role).await;
        let user = self
            .finish(tx, result, Some(actor_id), actions::UPDATE_USER)
            .await?;

        tracing::info!(actor_id, user_id, role = role.as_str(), "User role changed");
        Ok(user)
    }

    pub async fn find_user(&self, user_id: DbId) -> EngineResult<User> {
        let mut conn = self.pool.acquire().await?;
        UserRepo::find_by_id(&mut conn, user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "User",
                    id: user_id,
                }
                .into()
            })
    }
}

async fn create_in(
    conn: &mut PgConnection,
    actor_id: DbId,
    input: &CreateUser,
) -> EngineResult<User> {
    authorizer::require(conn, actor_id, Permission::ManageUsers, None).await?;
    register_in(conn, input, Some(actor_id)).await
}

/// `created_by` is `None` for self-service sign-up.
async fn register_in(
    conn: &mut PgConnection,
    input: &CreateUser,
    created_by: Option<DbId>,
) -> EngineResult<User> {
    let user = UserRepo::create(conn, input)
        .await
        .map_err(conflict_on_user_identity)?;

    ReputationRepo::upsert(conn, user.id, &ReputationSummary::empty()).await?;
    statistics::refresh(conn, user.id).await?;

    AuditLogger::record(
        conn,
        audited_tables::USERS,
        AuditOperation::Insert,
        user.id,
        Some(created_by.unwrap_or(user.id)),
        None,
        Some(&user),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(created_by.unwrap_or(user.id)),
            actions::REGISTER,
            entity_types::USER,
            user.id,
            Some(serde_json::json!({ "role": user.role })),
        ),
    )
    .await;
    Ok(user)
}

/// Both identity columns are unique; report whichever one collided.
fn conflict_on_user_identity(err: sqlx::Error) -> EngineError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    };
    match constraint.as_deref() {
        Some("uq_users_email") => {
            conflict_on("uq_users_email", "Email is already registered")(err)
        }
        _ => conflict_on("uq_users_username", "Username is already taken")(err),
    }
}

async fn set_active_in(
    conn: &mut PgConnection,
    actor_id: DbId,
    user_id: DbId,
    is_active: bool,
) -> EngineResult<User> {
    authorizer::require(conn, actor_id, Permission::BanUsers, None).await?;
    let before = find_for_update(conn, user_id).await?;
    let after = UserRepo::set_active(conn, user_id, is_active)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
    record_user_change(conn, actor_id, &before, &after, "is_active").await;
    Ok(after)
}

async fn set_role_in(
    conn: &mut PgConnection,
    actor_id: DbId,
    user_id: DbId,
    role: Role,
) -> EngineResult<User> {
    authorizer::require(conn, actor_id, Permission::ManageUsers, None).await?;
    let before = find_for_update(conn, user_id).await?;
    let after = UserRepo::set_role(conn, user_id, role.as_str())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
    record_user_change(conn, actor_id, &before, &after, "role").await;
    Ok(after)
}

async fn find_for_update(conn: &mut PgConnection, user_id: DbId) -> EngineResult<User> {
    UserRepo::find_by_id_for_update(conn, user_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "User",
                id: user_id,
            }
            .into()
        })
}

async fn record_user_change(
    conn: &mut PgConnection,
    actor_id: DbId,
    before: &User,
    after: &User,
    field: &str,
) {
    AuditLogger::record(
        conn,
        audited_tables::USERS,
        AuditOperation::Update,
        after.id,
        Some(actor_id),
        Some(before),
        Some(after),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::UPDATE_USER,
            entity_types::USER,
            after.id,
            Some(serde_json::json!({ "field": field })),
        ),
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_username_and_email() {
        assert!(validate_registration("alice", "alice@example.com").is_ok());
        assert!(validate_registration("   ", "alice@example.com").is_err());
        assert!(validate_registration("alice", "alice.example.com").is_err());
        assert!(validate_registration("alice", "@example.com").is_err());
        assert!(validate_registration("alice", "alice@").is_err());
    }

    #[test]
    fn overlong_username_rejected() {
        let name = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_registration(&name, "a@b.c").is_err());
    }
}
