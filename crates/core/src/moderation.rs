//! Moderation decisions on pending listings.

use crate::error::CoreError;
use crate::listing::ListingStatus;
use crate::notification::ListingEvent;

pub const ACTION_APPROVE: &str = "approve";
pub const ACTION_REJECT: &str = "reject";

/// All valid moderation actions. Must match the `listing_moderations.action` CHECK.
pub const VALID_ACTIONS: &[&str] = &[ACTION_APPROVE, ACTION_REJECT];

/// A moderator's decision on a pending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => ACTION_APPROVE,
            Self::Reject => ACTION_REJECT,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            ACTION_APPROVE => Ok(Self::Approve),
            ACTION_REJECT => Ok(Self::Reject),
            other => Err(CoreError::Validation(format!(
                "Invalid moderation action '{other}'. Must be one of: {}",
                VALID_ACTIONS.join(", ")
            ))),
        }
    }

    /// Status the listing moves to when this action commits.
    pub fn target_status(&self) -> ListingStatus {
        match self {
            Self::Approve => ListingStatus::Active,
            Self::Reject => ListingStatus::Rejected,
        }
    }

    /// Event reported to the listing owner. The reason only travels with
    /// rejections.
    pub fn listing_event<'a>(&self, reason: Option<&'a str>) -> ListingEvent<'a> {
        match self {
            Self::Approve => ListingEvent::Approved,
            Self::Reject => ListingEvent::Rejected { reason },
        }
    }
}

/// Check that `current` may be moderated.
///
/// Only `pending` listings accept a decision; anything else means another
/// moderator got there first or the listing left the queue.
pub fn ensure_moderatable(current: ListingStatus) -> Result<(), CoreError> {
    if current == ListingStatus::Pending {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Listing is '{}', only pending listings can be moderated",
            current.as_str()
        )))
    }
}

/// Normalise an optional free-text reason. Blank reasons become `None`.
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_activates_and_reject_rejects() {
        assert_eq!(ModerationAction::Approve.target_status(), ListingStatus::Active);
        assert_eq!(ModerationAction::Reject.target_status(), ListingStatus::Rejected);
    }

    #[test]
    fn target_status_is_a_legal_transition() {
        for action in [ModerationAction::Approve, ModerationAction::Reject] {
            assert!(ListingStatus::Pending.can_transition_to(action.target_status()));
        }
    }

    #[test]
    fn only_pending_is_moderatable() {
        assert!(ensure_moderatable(ListingStatus::Pending).is_ok());
        for s in [
            ListingStatus::Active,
            ListingStatus::Rejected,
            ListingStatus::Sold,
            ListingStatus::Expired,
        ] {
            assert!(matches!(
                ensure_moderatable(s),
                Err(CoreError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn approval_drops_the_reason() {
        assert_eq!(
            ModerationAction::Approve.listing_event(Some("nice")),
            ListingEvent::Approved
        );
        assert_eq!(
            ModerationAction::Reject.listing_event(Some("spam")),
            ListingEvent::Rejected {
                reason: Some("spam")
            }
        );
    }

    #[test]
    fn unknown_action_is_validation_error() {
        assert!(matches!(
            ModerationAction::from_str("pause"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn blank_reason_is_dropped() {
        assert_eq!(normalize_reason(Some("   ")), None);
        assert_eq!(normalize_reason(None), None);
        assert_eq!(normalize_reason(Some(" spam ")), Some("spam".to_string()));
    }
}
