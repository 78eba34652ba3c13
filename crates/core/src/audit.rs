//! Activity and audit log vocabulary, redaction, and the audit hash chain.
//!
//! Activity entries record what a user did; audit entries record how a row in
//! one of the critical tables changed. Both are append-only.

use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Activity actions
// ---------------------------------------------------------------------------

/// Action strings written to `user_activity_log.action`.
pub mod actions {
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const UPDATE_USER: &str = "update_user";
    pub const CREATE_CATEGORY: &str = "create_category";
    pub const UPDATE_CATEGORY: &str = "update_category";
    pub const CREATE_LISTING: &str = "create_listing";
    pub const UPDATE_LISTING: &str = "update_listing";
    pub const DELETE_LISTING: &str = "delete_listing";
    pub const MARK_SOLD: &str = "mark_sold";
    pub const VIEW_LISTING: &str = "view_listing";
    pub const TOGGLE_FAVORITE: &str = "toggle_favorite";
    pub const MODERATE_LISTING: &str = "moderate_listing";
    pub const EXPIRE_LISTING: &str = "expire_listing";
    pub const CREATE_REVIEW: &str = "create_review";
    pub const UPDATE_REVIEW: &str = "update_review";
    pub const DELETE_REVIEW: &str = "delete_review";
    pub const CREATE_REPORT: &str = "create_report";
    pub const REVIEW_REPORT: &str = "review_report";
}

/// Security events, stored with a `security_` prefix.
pub mod security_events {
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const SOURCE_BLOCKED: &str = "source_blocked";
    pub const BLOCKED_ATTEMPT: &str = "blocked_attempt";
    pub const PERMISSION_DENIED: &str = "permission_denied";
}

/// Prefix for security event actions.
pub const SECURITY_PREFIX: &str = "security_";

/// Build the activity action string for a security event.
pub fn security_action(event: &str) -> String {
    format!("{SECURITY_PREFIX}{event}")
}

// ---------------------------------------------------------------------------
// Entity types and audited tables
// ---------------------------------------------------------------------------

pub mod entity_types {
    pub const USER: &str = "user";
    pub const CATEGORY: &str = "category";
    pub const LISTING: &str = "listing";
    pub const REVIEW: &str = "review";
    pub const REPORT: &str = "report";
}

/// Tables whose every mutation gets a before/after snapshot.
pub mod audited_tables {
    pub const USERS: &str = "users";
    pub const LISTINGS: &str = "listings";
    pub const REVIEWS: &str = "reviews";
    pub const REPORTS: &str = "reports";
}

/// Row operation recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    Insert,
    Update,
    Delete,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Check that the snapshot shape matches the operation: inserts carry
    /// only a new row, deletes only an old row, updates both.
    pub fn accepts(&self, has_old: bool, has_new: bool) -> bool {
        match self {
            Self::Insert => !has_old && has_new,
            Self::Update => has_old && has_new,
            Self::Delete => has_old && !has_new,
        }
    }
}

// ---------------------------------------------------------------------------
// Integrity hash chain
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "BAZAAR_AUDIT_CHAIN_V1";

/// Compute the chained SHA-256 hash for an audit entry.
///
/// `prev_hash` is the hash of the previous entry, `None` for the first one.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let digest = Sha256::digest(format!("{prev}|{entry_data}").as_bytes());
    format!("{digest:x}")
}

/// Canonical string fed into the hash for one audit entry.
///
/// `serde_json` keeps object keys sorted, so equal snapshots always produce
/// equal strings.
pub fn canonical_entry_data(
    table_name: &str,
    operation: AuditOperation,
    record_id: i64,
    changed_by: Option<i64>,
    old_data: Option<&serde_json::Value>,
    new_data: Option<&serde_json::Value>,
) -> String {
    serde_json::json!({
        "table": table_name,
        "operation": operation.as_str(),
        "record_id": record_id,
        "changed_by": changed_by,
        "old": old_data,
        "new": new_data,
    })
    .to_string()
}

/// Walk a chain of `(stored_hash, entry_data)` pairs in insertion order.
///
/// Returns the index of the first entry whose stored hash does not match, or
/// `None` if the whole chain verifies.
pub fn find_chain_break<'a, I>(entries: I) -> Option<usize>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut prev: Option<String> = None;
    for (idx, (stored, data)) in entries.into_iter().enumerate() {
        let expected = compute_integrity_hash(prev.as_deref(), &data);
        if expected != stored {
            return Some(idx);
        }
        prev = Some(expected);
    }
    None
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Keys whose values never reach the activity or audit logs.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "authorization",
    "credential",
];

/// Replace values of sensitive keys with `"[REDACTED]"`, recursively.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_actions_are_prefixed() {
        assert_eq!(
            security_action(security_events::LOGIN_FAILED),
            "security_login_failed"
        );
    }

    #[test]
    fn operation_snapshot_shapes() {
        assert!(AuditOperation::Insert.accepts(false, true));
        assert!(!AuditOperation::Insert.accepts(true, true));
        assert!(AuditOperation::Update.accepts(true, true));
        assert!(AuditOperation::Delete.accepts(true, false));
        assert!(!AuditOperation::Delete.accepts(false, false));
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let hash = compute_integrity_hash(None, "entry");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn previous_hash_changes_result() {
        let a = compute_integrity_hash(Some("a"), "same");
        let b = compute_integrity_hash(Some("b"), "same");
        assert_ne!(a, b);
    }

    #[test]
    fn intact_chain_verifies() {
        let d1 = "first".to_string();
        let d2 = "second".to_string();
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(&h1), &d2);
        assert_eq!(find_chain_break([(h1.as_str(), d1), (h2.as_str(), d2)]), None);
    }

    #[test]
    fn tampered_entry_breaks_chain() {
        let h1 = compute_integrity_hash(None, "first");
        let h2 = compute_integrity_hash(Some(&h1), "second");
        let entries = [
            (h1.as_str(), "first".to_string()),
            (h2.as_str(), "tampered".to_string()),
        ];
        assert_eq!(find_chain_break(entries), Some(1));
    }

    #[test]
    fn canonical_data_is_stable() {
        let new = serde_json::json!({"title": "Lamp", "price": 10});
        let a = canonical_entry_data("listings", AuditOperation::Insert, 1, Some(2), None, Some(&new));
        let b = canonical_entry_data("listings", AuditOperation::Insert, 1, Some(2), None, Some(&new));
        assert_eq!(a, b);
        assert!(a.contains("\"operation\":\"INSERT\""));
    }

    #[test]
    fn redacts_password_hash() {
        let input = serde_json::json!({"username": "alice", "password_hash": "$argon2id$..."});
        let result = redact_sensitive_fields(&input);
        assert_eq!(result["username"], "alice");
        assert_eq!(result["password_hash"], "[REDACTED]");
    }

    #[test]
    fn redacts_nested_and_array_values() {
        let input = serde_json::json!({"outer": [{"api_key": "k"}, {"name": "n"}]});
        let result = redact_sensitive_fields(&input);
        assert_eq!(result["outer"][0]["api_key"], "[REDACTED]");
        assert_eq!(result["outer"][1]["name"], "n");
    }
}
