//! Best-effort activity and audit logging.
//!
//! Writes inside a business transaction go through a savepoint: if the log
//! insert fails, only the savepoint is rolled back and the failure is
//! reported with `tracing::warn!`. The enclosing transaction carries on.

use bazaar_core::audit::{
    canonical_entry_data, compute_integrity_hash, find_chain_break, redact_sensitive_fields,
    AuditOperation,
};
use bazaar_core::roles::Permission;
use bazaar_core::types::DbId;
use bazaar_db::models::activity::{ActivityLogEntry, ActivityQuery, CreateActivityLogEntry};
use bazaar_db::models::audit::{AuditLogPage, AuditQuery, CreateAuditEntry, IntegrityCheckResult};
use bazaar_db::repositories::{ActivityLogRepo, AuditLogRepo};
use serde::Serialize;
use sqlx::{Connection, PgConnection, PgPool};

use crate::authorizer;
use crate::error::EngineResult;
use crate::Engine;

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

pub struct ActivityLogger;

impl ActivityLogger {
    /// Append an activity entry inside the caller's transaction.
    pub async fn record(conn: &mut PgConnection, mut entry: CreateActivityLogEntry) {
        entry.details = entry.details.as_ref().map(redact_sensitive_fields);

        let mut savepoint = match conn.begin().await {
            Ok(sp) => sp,
            Err(e) => {
                tracing::warn!(error = %e, action = %entry.action, "Activity log unavailable");
                return;
            }
        };
        match ActivityLogRepo::insert(&mut *savepoint, &entry).await {
            Ok(_) => {
                if let Err(e) = savepoint.commit().await {
                    tracing::warn!(error = %e, action = %entry.action, "Activity log release failed");
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = entry.user_id,
                    action = %entry.action,
                    "Activity log write failed"
                );
                if let Err(e) = savepoint.rollback().await {
                    tracing::warn!(error = %e, "Activity log savepoint rollback failed");
                }
            }
        }
    }

    /// Append an activity entry on its own connection, outside any
    /// business transaction.
    pub async fn record_detached(pool: &PgPool, mut entry: CreateActivityLogEntry) {
        entry.details = entry.details.as_ref().map(redact_sensitive_fields);

        let result = async {
            let mut conn = pool.acquire().await?;
            ActivityLogRepo::insert(&mut conn, &entry).await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                user_id = entry.user_id,
                action = %entry.action,
                "Activity log write failed"
            );
        }
    }
}

/// Shorthand for an entry about one entity.
pub fn activity(
    user_id: Option<DbId>,
    action: &str,
    entity_type: &str,
    entity_id: DbId,
    details: Option<serde_json::Value>,
) -> CreateActivityLogEntry {
    CreateActivityLogEntry {
        user_id,
        action: action.to_string(),
        entity_type: Some(entity_type.to_string()),
        entity_id: Some(entity_id),
        details,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

pub struct AuditLogger;

impl AuditLogger {
    /// Append a before/after snapshot for one row change.
    ///
    /// Snapshots are redacted before hashing and storage. The chain lock is
    /// held until the enclosing transaction ends.
    pub async fn record<T: Serialize>(
        conn: &mut PgConnection,
        table_name: &str,
        operation: AuditOperation,
        record_id: DbId,
        changed_by: Option<DbId>,
        old: Option<&T>,
        new: Option<&T>,
    ) {
        debug_assert!(operation.accepts(old.is_some(), new.is_some()));

        let old_data = old.and_then(|v| snapshot(v, table_name));
        let new_data = new.and_then(|v| snapshot(v, table_name));

        let mut savepoint = match conn.begin().await {
            Ok(sp) => sp,
            Err(e) => {
                tracing::warn!(error = %e, table_name, record_id, "Audit log unavailable");
                return;
            }
        };

        let result = async {
            AuditLogRepo::lock_chain(&mut *savepoint).await?;
            let prev = AuditLogRepo::find_last_hash(&mut *savepoint).await?;
            let data = canonical_entry_data(
                table_name,
                operation,
                record_id,
                changed_by,
                old_data.as_ref(),
                new_data.as_ref(),
            );
            let entry = CreateAuditEntry {
                table_name: table_name.to_string(),
                operation: operation.as_str().to_string(),
                record_id,
                changed_by,
                integrity_hash: compute_integrity_hash(prev.as_deref(), &data),
                old_data,
                new_data,
            };
            AuditLogRepo::insert(&mut *savepoint, &entry).await
        }
        .await;

        match result {
            Ok(_) => {
                if let Err(e) = savepoint.commit().await {
                    tracing::warn!(error = %e, table_name, record_id, "Audit log release failed");
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    table_name,
                    record_id,
                    operation = operation.as_str(),
                    "Audit log write failed"
                );
                if let Err(e) = savepoint.rollback().await {
                    tracing::warn!(error = %e, "Audit log savepoint rollback failed");
                }
            }
        }
    }
}

fn snapshot<T: Serialize>(value: &T, table_name: &str) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(redact_sensitive_fields(&json)),
        Err(e) => {
            tracing::warn!(error = %e, table_name, "Audit snapshot serialization failed");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

impl Engine {
    /// Activity entries. Users may read their own; reading anyone else's
    /// requires `view_audit_log`.
    pub async fn list_activity(
        &self,
        actor_id: DbId,
        params: &ActivityQuery,
    ) -> EngineResult<Vec<ActivityLogEntry>> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        let own = params.user_id == Some(actor_id)
            && subject.as_ref().is_some_and(|s| s.is_active);
        if !own {
            authorizer::ensure(subject.as_ref(), Permission::ViewAuditLog, None)?;
        }
        Ok(ActivityLogRepo::query(&self.pool, params).await?)
    }

    /// Filtered audit entries plus the total match count.
    pub async fn query_audit_log(
        &self,
        actor_id: DbId,
        params: &AuditQuery,
    ) -> EngineResult<AuditLogPage> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ViewAuditLog, None)?;

        let items = AuditLogRepo::query(&self.pool, params).await?;
        let total = AuditLogRepo::count(&self.pool, params).await?;
        Ok(AuditLogPage { items, total })
    }

    /// Walk the whole audit chain and report the first entry whose hash does
    /// not match its content and predecessor.
    pub async fn verify_audit_chain(&self, actor_id: DbId) -> EngineResult<IntegrityCheckResult> {
        let mut conn = self.pool.acquire().await?;
        let subject = authorizer::load_subject(&mut conn, actor_id).await?;
        authorizer::ensure(subject.as_ref(), Permission::ViewAuditLog, None)?;

        let entries = AuditLogRepo::fetch_chain(&self.pool).await?;
        let pairs = entries.iter().map(|e| {
            // An unknown operation string can never reproduce the stored hash.
            (e.integrity_hash.as_str(), e.canonical_data().unwrap_or_default())
        });
        let first_break = find_chain_break(pairs).map(|idx| entries[idx].id);

        let result = IntegrityCheckResult {
            verified_entries: entries.len() as i64,
            chain_valid: first_break.is_none(),
            first_break,
        };
        if let Some(id) = first_break {
            tracing::error!(entry_id = id, "Audit chain broken");
        }
        Ok(result)
    }
}
