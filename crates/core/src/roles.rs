//! Roles, permissions, and the RBAC decision function.
//!
//! Roles form a fixed three-tier hierarchy. Permissions are a closed enum and
//! the grant table below is the only place that decides who may do what.
//! Role names must match the `CHECK` constraint on `users.role`.

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_USER: &str = "user";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_ADMIN: &str = "admin";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_MODERATOR, ROLE_ADMIN];

/// Account role. Exactly one per user, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => ROLE_USER,
            Self::Moderator => ROLE_MODERATOR,
            Self::Admin => ROLE_ADMIN,
        }
    }

    /// Parse from a string, returning an error for unknown roles.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            ROLE_USER => Ok(Self::User),
            ROLE_MODERATOR => Ok(Self::Moderator),
            ROLE_ADMIN => Ok(Self::Admin),
            other => Err(CoreError::Validation(format!(
                "Unknown role: '{other}'. Valid roles: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }

    /// Moderators and admins may act on content they do not own.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

/// Every permission the marketplace knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    // Base user set.
    CreateListing,
    LeaveReview,
    ReportContent,
    ManageFavorites,
    ViewProfile,
    ViewOwnNotifications,
    // Ownership-scoped.
    EditOwnListing,
    DeleteOwnListing,
    // Moderator set.
    ModerateListings,
    ViewReports,
    BanUsers,
    ViewModerationLog,
    ViewAllNotifications,
    // Admin only.
    ManageUsers,
    ManageCategories,
    ManageRoles,
    ViewStatistics,
    SystemSettings,
    BackupManagement,
    ViewAuditLog,
    ManagePermissions,
}

/// Granted to any active user.
pub const BASE_PERMISSIONS: &[Permission] = &[
    Permission::CreateListing,
    Permission::LeaveReview,
    Permission::ReportContent,
    Permission::ManageFavorites,
    Permission::ViewProfile,
    Permission::ViewOwnNotifications,
];

/// Granted only when the acting user owns the target entity.
pub const OWNERSHIP_PERMISSIONS: &[Permission] =
    &[Permission::EditOwnListing, Permission::DeleteOwnListing];

/// Granted to moderators on top of [`BASE_PERMISSIONS`].
pub const MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::ModerateListings,
    Permission::ViewReports,
    Permission::BanUsers,
    Permission::ViewModerationLog,
    Permission::ViewAllNotifications,
];

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateListing => "create_listing",
            Self::LeaveReview => "leave_review",
            Self::ReportContent => "report_content",
            Self::ManageFavorites => "manage_favorites",
            Self::ViewProfile => "view_profile",
            Self::ViewOwnNotifications => "view_own_notifications",
            Self::EditOwnListing => "edit_own_listing",
            Self::DeleteOwnListing => "delete_own_listing",
            Self::ModerateListings => "moderate_listings",
            Self::ViewReports => "view_reports",
            Self::BanUsers => "ban_users",
            Self::ViewModerationLog => "view_moderation_log",
            Self::ViewAllNotifications => "view_all_notifications",
            Self::ManageUsers => "manage_users",
            Self::ManageCategories => "manage_categories",
            Self::ManageRoles => "manage_roles",
            Self::ViewStatistics => "view_statistics",
            Self::SystemSettings => "system_settings",
            Self::BackupManagement => "backup_management",
            Self::ViewAuditLog => "view_audit_log",
            Self::ManagePermissions => "manage_permissions",
        }
    }

    /// Parse a permission name as used by callers of `check_permission`.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        ALL_PERMISSIONS
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown permission: '{s}'")))
    }
}

/// Every permission, in declaration order.
pub const ALL_PERMISSIONS: &[Permission] = &[
    Permission::CreateListing,
    Permission::LeaveReview,
    Permission::ReportContent,
    Permission::ManageFavorites,
    Permission::ViewProfile,
    Permission::ViewOwnNotifications,
    Permission::EditOwnListing,
    Permission::DeleteOwnListing,
    Permission::ModerateListings,
    Permission::ViewReports,
    Permission::BanUsers,
    Permission::ViewModerationLog,
    Permission::ViewAllNotifications,
    Permission::ManageUsers,
    Permission::ManageCategories,
    Permission::ManageRoles,
    Permission::ViewStatistics,
    Permission::SystemSettings,
    Permission::BackupManagement,
    Permission::ViewAuditLog,
    Permission::ManagePermissions,
];

/// The acting user as seen by the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub user_id: DbId,
    pub role: Role,
    pub is_active: bool,
}

/// Decide whether `subject` holds `permission`.
///
/// `entity_owner` is the owner id of the entity the permission is exercised
/// on, when there is one. Precedence:
///
/// 1. unknown or inactive subject: deny
/// 2. admin: grant
/// 3. moderator: moderator set
/// 4. any active user: base set
/// 5. ownership-scoped permissions: only when `subject` owns the entity
pub fn authorize(
    subject: Option<&Subject>,
    permission: Permission,
    entity_owner: Option<DbId>,
) -> bool {
    let Some(subject) = subject else {
        return false;
    };
    if !subject.is_active {
        return false;
    }
    if subject.role == Role::Admin {
        return true;
    }
    if subject.role == Role::Moderator && MODERATOR_PERMISSIONS.contains(&permission) {
        return true;
    }
    if BASE_PERMISSIONS.contains(&permission) {
        return true;
    }
    if OWNERSHIP_PERMISSIONS.contains(&permission) {
        return entity_owner == Some(subject.user_id);
    }
    false
}

/// Like [`authorize`], but moderators and admins also pass for content they
/// do not own. Used for removals, where staff act on other users' content.
pub fn authorize_owner_or_staff(
    subject: Option<&Subject>,
    permission: Permission,
    entity_owner: Option<DbId>,
) -> bool {
    authorize(subject, permission, entity_owner)
        || subject.is_some_and(|s| s.is_active && s.role.is_staff())
}

/// All permissions a role holds without regard to ownership.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    let subject = Subject {
        user_id: 0,
        role,
        is_active: true,
    };
    ALL_PERMISSIONS
        .iter()
        .copied()
        .filter(|p| authorize(Some(&subject), *p, None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(role: Role) -> Subject {
        Subject {
            user_id: 7,
            role,
            is_active: true,
        }
    }

    #[test]
    fn unknown_subject_is_denied_everything() {
        for p in ALL_PERMISSIONS {
            assert!(!authorize(None, *p, Some(7)));
        }
    }

    #[test]
    fn inactive_admin_is_denied() {
        let s = Subject {
            is_active: false,
            ..subject(Role::Admin)
        };
        assert!(!authorize(Some(&s), Permission::ViewProfile, None));
        assert!(!authorize(Some(&s), Permission::ManageUsers, None));
    }

    #[test]
    fn admin_gets_everything() {
        let s = subject(Role::Admin);
        for p in ALL_PERMISSIONS {
            assert!(authorize(Some(&s), *p, None), "admin denied {}", p.as_str());
        }
    }

    #[test]
    fn moderator_gets_moderation_and_base_sets() {
        let s = subject(Role::Moderator);
        assert!(authorize(Some(&s), Permission::ModerateListings, None));
        assert!(authorize(Some(&s), Permission::ViewModerationLog, None));
        assert!(authorize(Some(&s), Permission::LeaveReview, None));
        assert!(!authorize(Some(&s), Permission::ManageUsers, None));
        assert!(!authorize(Some(&s), Permission::ViewAuditLog, None));
    }

    #[test]
    fn user_gets_base_set_only() {
        let s = subject(Role::User);
        assert!(authorize(Some(&s), Permission::CreateListing, None));
        assert!(authorize(Some(&s), Permission::ManageFavorites, None));
        assert!(!authorize(Some(&s), Permission::ModerateListings, None));
        assert!(!authorize(Some(&s), Permission::BanUsers, None));
    }

    #[test]
    fn ownership_permissions_require_matching_owner() {
        let s = subject(Role::User);
        assert!(authorize(Some(&s), Permission::EditOwnListing, Some(7)));
        assert!(authorize(Some(&s), Permission::DeleteOwnListing, Some(7)));
        assert!(!authorize(Some(&s), Permission::EditOwnListing, Some(8)));
        assert!(!authorize(Some(&s), Permission::DeleteOwnListing, None));
    }

    #[test]
    fn moderator_does_not_own_other_listings() {
        let s = subject(Role::Moderator);
        assert!(!authorize(Some(&s), Permission::EditOwnListing, Some(99)));
    }

    #[test]
    fn permission_names_round_trip() {
        for p in ALL_PERMISSIONS {
            assert_eq!(Permission::from_str(p.as_str()).unwrap(), *p);
        }
        assert!(Permission::from_str("fly").is_err());
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(Role::from_str("moderator").unwrap(), Role::Moderator);
        let err = Role::from_str("superuser").unwrap_err();
        assert!(err.to_string().contains("Unknown role"));
    }

    #[test]
    fn permissions_for_user_excludes_ownership_scoped() {
        let perms = permissions_for(Role::User);
        assert_eq!(perms.len(), BASE_PERMISSIONS.len());
        assert!(!perms.contains(&Permission::EditOwnListing));
    }

    #[test]
    fn staff_may_remove_content_they_do_not_own() {
        let moderator = subject(Role::Moderator);
        let user = subject(Role::User);
        let p = Permission::DeleteOwnListing;
        assert!(authorize_owner_or_staff(Some(&moderator), p, Some(99)));
        assert!(!authorize_owner_or_staff(Some(&user), p, Some(99)));
        assert!(authorize_owner_or_staff(Some(&user), p, Some(user.user_id)));

        let inactive = Subject {
            is_active: false,
            ..moderator
        };
        assert!(!authorize_owner_or_staff(Some(&inactive), p, Some(99)));
    }
}
