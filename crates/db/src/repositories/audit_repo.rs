//! Repository for the append-only `audit_log` table.

use bazaar_core::search::clamp_offset;
use bazaar_core::types::Timestamp;
use sqlx::{PgConnection, PgPool};

use crate::models::audit::{AuditEntry, AuditQuery, CreateAuditEntry};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `audit_log` SELECT queries.
const COLUMNS: &str = "\
    id, table_name, operation, record_id, changed_by, \
    old_data, new_data, integrity_hash, created_at";

/// Default and maximum page size for audit queries.
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Advisory lock key that serializes appends to the hash chain.
const CHAIN_LOCK_KEY: i64 = 0x0042_415A_4155_4454;

// ---------------------------------------------------------------------------
// AuditLogRepo
// ---------------------------------------------------------------------------

/// Provides append and query operations for the audit log.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Take the transaction-scoped chain lock.
    ///
    /// Held until the enclosing transaction ends, so the "read last hash,
    /// insert next entry" pair cannot interleave with another writer.
    pub async fn lock_chain(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Find the integrity hash of the most recent audit entry.
    pub async fn find_last_hash(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT integrity_hash FROM audit_log ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        entry: &CreateAuditEntry,
    ) -> Result<AuditEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_log
                (table_name, operation, record_id, changed_by, old_data, new_data, integrity_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(&entry.table_name)
            .bind(&entry.operation)
            .bind(entry.record_id)
            .bind(entry.changed_by)
            .bind(&entry.old_data)
            .bind(&entry.new_data)
            .bind(&entry.integrity_hash)
            .fetch_one(&mut *conn)
            .await
    }

    /// Query audit entries with filtering and pagination, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = clamp_offset(params.offset);

        let (where_clause, bind_values, bind_idx) = build_audit_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_log {where_clause} \
             ORDER BY id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditEntry>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count audit entries matching the given filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_audit_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT AS count FROM audit_log {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }

    /// All entries in id order, for sequential hash chain checking.
    pub async fn fetch_chain(pool: &PgPool) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_log ORDER BY id ASC");
        sqlx::query_as::<_, AuditEntry>(&query).fetch_all(pool).await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
/// The `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_audit_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(ref table_name) = params.table_name {
        conditions.push(format!("table_name = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(table_name.clone()));
    }

    if let Some(record_id) = params.record_id {
        conditions.push(format!("record_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(record_id));
    }

    if let Some(changed_by) = params.changed_by {
        conditions.push(format!("changed_by = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(changed_by));
    }

    if let Some(ref operation) = params.operation {
        conditions.push(format!("operation = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(operation.clone()));
    }

    if let Some(from) = params.from {
        conditions.push(format!("created_at >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = params.to {
        conditions.push(format!("created_at <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}
