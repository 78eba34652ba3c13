//! Login-attempt guard and password authentication.
//!
//! Failures are counted per source address. The counter row is locked for
//! the read-compute-write cycle, so concurrent failures from one source are
//! applied one after another and none is lost.

use bazaar_core::audit::{actions, entity_types, security_events};
use bazaar_core::error::CoreError;
use bazaar_core::login_guard::{is_blocked, LockoutPolicy};
use bazaar_core::types::Timestamp;
use bazaar_db::models::activity::CreateActivityLogEntry;
use bazaar_db::models::login_attempt::FailedLoginAttempt;
use bazaar_db::models::user::User;
use bazaar_db::repositories::{LoginAttemptRepo, UserRepo};
use chrono::Utc;
use sqlx::PgConnection;

use crate::error::EngineResult;
use crate::logging::ActivityLogger;
use crate::password::{verify_against_dummy, verify_password};
use crate::Engine;

impl Engine {
    /// Whether `source` is currently blocked.
    pub async fn check_blocked(&self, source: &str) -> EngineResult<bool> {
        self.check_blocked_at(source, Utc::now()).await
    }

    pub async fn check_blocked_at(&self, source: &str, now: Timestamp) -> EngineResult<bool> {
        let record = LoginAttemptRepo::find(&self.pool, source).await?;
        Ok(record.is_some_and(|r| is_blocked(&r.state(), now)))
    }

    /// Count one failed authentication from `source`.
    ///
    /// Reaching the configured threshold blocks the source for the configured
    /// duration.
    pub async fn record_failed_login(
        &self,
        identity: &str,
        source: &str,
    ) -> EngineResult<FailedLoginAttempt> {
        self.record_failed_login_at(identity, source, Utc::now()).await
    }

    pub async fn record_failed_login_at(
        &self,
        identity: &str,
        source: &str,
        now: Timestamp,
    ) -> EngineResult<FailedLoginAttempt> {
        let mut tx = self.pool.begin().await?;
        let result = record_failure_in(&mut tx, &self.config.lockout, identity, source, now).await;
        let (was_blocked, record) = self
            .finish(tx, result, None, security_events::LOGIN_FAILED)
            .await?;

        let details = serde_json::json!({
            "username": identity,
            "attempt_count": record.attempt_count,
        });
        self.security_event(None, security_events::LOGIN_FAILED, details, Some(source))
            .await;

        if record.blocked && !was_blocked {
            self.security_event(
                None,
                security_events::SOURCE_BLOCKED,
                serde_json::json!({
                    "username": identity,
                    "blocked_until": record.blocked_until,
                }),
                Some(source),
            )
            .await;
        }
        Ok(record)
    }

    /// Forget earlier failures from `source`. Returns `true` if a record
    /// existed.
    pub async fn record_successful_login(&self, source: &str) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = LoginAttemptRepo::clear(&mut tx, source)
            .await
            .map_err(Into::into);
        self.finish(tx, result, None, actions::LOGIN).await
    }

    /// Verify credentials for `username` coming from `source`.
    ///
    /// A blocked source is refused before the password is looked at. Wrong
    /// credentials count as a failure for the source. Success clears the
    /// source's failure record.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        source: &str,
        user_agent: Option<&str>,
    ) -> EngineResult<User> {
        self.authenticate_at(username, password, source, user_agent, Utc::now())
            .await
    }

    pub async fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        source: &str,
        user_agent: Option<&str>,
        now: Timestamp,
    ) -> EngineResult<User> {
        if self.check_blocked_at(source, now).await? {
            self.security_event(
                None,
                security_events::BLOCKED_ATTEMPT,
                serde_json::json!({ "username": username }),
                Some(source),
            )
            .await;
            return Err(CoreError::Unauthorized(
                "Too many failed login attempts, try again later".into(),
            )
            .into());
        }

        let user = UserRepo::find_by_username(&self.pool, username).await?;
        let verified = match &user {
            Some(u) => verify_password(password, &u.password_hash)?,
            None => verify_against_dummy(password)?,
        };
        let Some(user) = user.filter(|_| verified) else {
            self.record_failed_login_at(username, source, now).await?;
            return Err(CoreError::Unauthorized("Invalid username or password".into()).into());
        };

        if !user.is_active {
            return Err(CoreError::Forbidden("Account is inactive".into()).into());
        }

        let mut tx = self.pool.begin().await?;
        let result = login_in(&mut tx, &user, source, user_agent, now).await;
        self.finish(tx, result, Some(user.id), actions::LOGIN).await?;

        tracing::info!(user_id = user.id, source, "User logged in");
        Ok(user)
    }
}

/// Returns whether the source was already blocked, and the stored record.
async fn record_failure_in(
    conn: &mut PgConnection,
    policy: &LockoutPolicy,
    identity: &str,
    source: &str,
    now: Timestamp,
) -> EngineResult<(bool, FailedLoginAttempt)> {
    let current = LoginAttemptRepo::lock_or_create(conn, source, now).await?;
    let prev = current.state();
    let was_blocked = is_blocked(&prev, now);
    let next = policy.next_after_failure(Some(&prev), now);

    let saved = LoginAttemptRepo::save(conn, source, Some(identity), &next).await?;
    tracing::debug!(
        source,
        attempt_count = saved.attempt_count,
        blocked = saved.blocked,
        "Failed login recorded"
    );
    Ok((was_blocked, saved))
}

async fn login_in(
    conn: &mut PgConnection,
    user: &User,
    source: &str,
    user_agent: Option<&str>,
    now: Timestamp,
) -> EngineResult<()> {
    LoginAttemptRepo::clear(conn, source).await?;
    UserRepo::record_login(conn, user.id, now).await?;
    ActivityLogger::record(
        conn,
        CreateActivityLogEntry {
            user_id: Some(user.id),
            action: actions::LOGIN.to_string(),
            entity_type: Some(entity_types::USER.to_string()),
            entity_id: Some(user.id),
            ip_address: Some(source.to_string()),
            user_agent: user_agent.map(str::to_string),
            details: None,
        },
    )
    .await;
    Ok(())
}
