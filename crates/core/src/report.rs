//! Content reports and their review workflow.
//!
//! A report points at a user, a listing, or both. Moderators take reports
//! from the pending queue and close them as resolved or dismissed.

use crate::error::CoreError;
use crate::types::DbId;

pub const TYPE_SPAM: &str = "spam";
pub const TYPE_INAPPROPRIATE: &str = "inappropriate";
pub const TYPE_FRAUD: &str = "fraud";
pub const TYPE_DUPLICATE: &str = "duplicate";
pub const TYPE_OTHER: &str = "other";

/// Must match the `reports.report_type` CHECK.
pub const VALID_TYPES: &[&str] = &[
    TYPE_SPAM,
    TYPE_INAPPROPRIATE,
    TYPE_FRAUD,
    TYPE_DUPLICATE,
    TYPE_OTHER,
];

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_DISMISSED: &str = "dismissed";

pub const ACTION_TAKE: &str = "take";
pub const ACTION_RESOLVE: &str = "resolve";
pub const ACTION_DISMISS: &str = "dismiss";

pub const VALID_ACTIONS: &[&str] = &[ACTION_TAKE, ACTION_RESOLVE, ACTION_DISMISS];

pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Spam,
    Inappropriate,
    Fraud,
    Duplicate,
    Other,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => TYPE_SPAM,
            Self::Inappropriate => TYPE_INAPPROPRIATE,
            Self::Fraud => TYPE_FRAUD,
            Self::Duplicate => TYPE_DUPLICATE,
            Self::Other => TYPE_OTHER,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            TYPE_SPAM => Ok(Self::Spam),
            TYPE_INAPPROPRIATE => Ok(Self::Inappropriate),
            TYPE_FRAUD => Ok(Self::Fraud),
            TYPE_DUPLICATE => Ok(Self::Duplicate),
            TYPE_OTHER => Ok(Self::Other),
            other => Err(CoreError::Validation(format!(
                "Invalid report type '{other}'. Must be one of: {}",
                VALID_TYPES.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Resolved => STATUS_RESOLVED,
            Self::Dismissed => STATUS_DISMISSED,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_PENDING => Ok(Self::Pending),
            STATUS_IN_PROGRESS => Ok(Self::InProgress),
            STATUS_RESOLVED => Ok(Self::Resolved),
            STATUS_DISMISSED => Ok(Self::Dismissed),
            other => Err(CoreError::Validation(format!(
                "Invalid report status '{other}'"
            ))),
        }
    }

    /// Resolved and dismissed reports are closed for good.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// What a moderator does with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Take,
    Resolve,
    Dismiss,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Take => ACTION_TAKE,
            Self::Resolve => ACTION_RESOLVE,
            Self::Dismiss => ACTION_DISMISS,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            ACTION_TAKE => Ok(Self::Take),
            ACTION_RESOLVE => Ok(Self::Resolve),
            ACTION_DISMISS => Ok(Self::Dismiss),
            other => Err(CoreError::Validation(format!(
                "Invalid report action '{other}'. Must be one of: {}",
                VALID_ACTIONS.join(", ")
            ))),
        }
    }

    pub fn target_status(&self) -> ReportStatus {
        match self {
            Self::Take => ReportStatus::InProgress,
            Self::Resolve => ReportStatus::Resolved,
            Self::Dismiss => ReportStatus::Dismissed,
        }
    }

    /// Whether applying this action closes the report.
    pub fn closes(&self) -> bool {
        !self.target_status().is_open()
    }
}

/// Check that `action` may be applied to a report in `current`.
///
/// Only pending reports can be taken. Pending and in-progress reports can
/// be closed.
pub fn ensure_actionable(current: ReportStatus, action: ReportAction) -> Result<(), CoreError> {
    let allowed = match action {
        ReportAction::Take => current == ReportStatus::Pending,
        ReportAction::Resolve | ReportAction::Dismiss => current.is_open(),
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Report is '{}', cannot {} it",
            current.as_str(),
            action.as_str()
        )))
    }
}

/// Validate a new report before any lookup happens.
pub fn validate_new_report(
    reporter_id: DbId,
    reported_user_id: Option<DbId>,
    reported_listing_id: Option<DbId>,
    description: &str,
) -> Result<(), CoreError> {
    if reported_user_id.is_none() && reported_listing_id.is_none() {
        return Err(CoreError::Validation(
            "A report must name a user or a listing".into(),
        ));
    }
    if reported_user_id == Some(reporter_id) {
        return Err(CoreError::Validation(
            "Users cannot report themselves".into(),
        ));
    }
    let description = description.trim();
    if description.is_empty() {
        return Err(CoreError::Validation("Description must not be empty".into()));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}
