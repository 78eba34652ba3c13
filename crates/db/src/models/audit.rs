//! Audit log entity models and DTOs.
//!
//! Audit entries are immutable and chained by `integrity_hash`.

use bazaar_core::audit::{canonical_entry_data, AuditOperation};
use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Audit entry
// ---------------------------------------------------------------------------

/// A row from the `audit_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: DbId,
    pub table_name: String,
    pub operation: String,
    pub record_id: DbId,
    pub changed_by: Option<DbId>,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

impl AuditEntry {
    /// Rebuild the string that was hashed when this entry was written.
    ///
    /// Returns `None` for an operation string outside the known set, which
    /// the chain check reports as a break.
    pub fn canonical_data(&self) -> Option<String> {
        let operation = match self.operation.as_str() {
            "INSERT" => AuditOperation::Insert,
            "UPDATE" => AuditOperation::Update,
            "DELETE" => AuditOperation::Delete,
            _ => return None,
        };
        Some(canonical_entry_data(
            &self.table_name,
            operation,
            self.record_id,
            self.changed_by,
            self.old_data.as_ref(),
            self.new_data.as_ref(),
        ))
    }
}

/// DTO for inserting an audit entry. The hash is computed by the caller.
#[derive(Debug, Clone)]
pub struct CreateAuditEntry {
    pub table_name: String,
    pub operation: String,
    pub record_id: DbId,
    pub changed_by: Option<DbId>,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub integrity_hash: String,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter parameters for querying the audit log.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub table_name: Option<String>,
    pub record_id: Option<DbId>,
    pub changed_by: Option<DbId>,
    pub operation: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated response for audit log queries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditEntry>,
    pub total: i64,
}

/// Result of an audit chain verification.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityCheckResult {
    /// Number of entries verified.
    pub verified_entries: i64,
    /// Whether the entire chain is valid.
    pub chain_valid: bool,
    /// ID of the first entry where the chain breaks, if any.
    pub first_break: Option<DbId>,
}
