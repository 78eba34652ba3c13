//! Notification kinds and message text.
//!
//! Notifications are persisted rows created as a side effect of lifecycle,
//! review, and moderation events. They are never created directly by clients.

pub const KIND_LISTING_APPROVED: &str = "listing_approved";
pub const KIND_LISTING_REJECTED: &str = "listing_rejected";
pub const KIND_LISTING_EXPIRED: &str = "listing_expired";
pub const KIND_NEW_REVIEW: &str = "new_review";

/// Must match the `notifications.kind` CHECK constraint.
pub const VALID_KINDS: &[&str] = &[
    KIND_LISTING_APPROVED,
    KIND_LISTING_REJECTED,
    KIND_LISTING_EXPIRED,
    KIND_NEW_REVIEW,
];

/// Events that produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ListingApproved,
    ListingRejected,
    ListingExpired,
    NewReview,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingApproved => KIND_LISTING_APPROVED,
            Self::ListingRejected => KIND_LISTING_REJECTED,
            Self::ListingExpired => KIND_LISTING_EXPIRED,
            Self::NewReview => KIND_NEW_REVIEW,
        }
    }

    /// Entity type the notification points at.
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::NewReview => crate::audit::entity_types::REVIEW,
            _ => crate::audit::entity_types::LISTING,
        }
    }
}

/// Rendered notification title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationText {
    pub title: String,
    pub content: String,
}

/// A listing lifecycle event addressed to the listing owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingEvent<'a> {
    Approved,
    Rejected { reason: Option<&'a str> },
    Expired,
}

impl ListingEvent<'_> {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Approved => NotificationKind::ListingApproved,
            Self::Rejected { .. } => NotificationKind::ListingRejected,
            Self::Expired => NotificationKind::ListingExpired,
        }
    }
}

/// Render the message for a listing event. A missing rejection reason is
/// spelled out.
pub fn listing_message(event: ListingEvent<'_>, listing_title: &str) -> NotificationText {
    match event {
        ListingEvent::Approved => NotificationText {
            title: "Listing approved".into(),
            content: format!("Your listing \"{listing_title}\" was approved and published."),
        },
        ListingEvent::Rejected { reason } => NotificationText {
            title: "Listing rejected".into(),
            content: format!(
                "Your listing \"{listing_title}\" was rejected. Reason: {}",
                reason.unwrap_or("not specified")
            ),
        },
        ListingEvent::Expired => NotificationText {
            title: "Listing expired".into(),
            content: format!(
                "Your listing \"{listing_title}\" has expired. Edit it to submit it again."
            ),
        },
    }
}

/// Render the message for a newly received review.
pub fn review_message(reviewer_name: &str, rating: i32) -> NotificationText {
    NotificationText {
        title: "New review".into(),
        content: format!("{reviewer_name} left you a review rated {rating}/5."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_includes_reason() {
        let text = listing_message(
            ListingEvent::Rejected {
                reason: Some("blurry photos"),
            },
            "Sofa",
        );
        assert!(text.content.contains("Sofa"));
        assert!(text.content.contains("blurry photos"));
    }

    #[test]
    fn rejection_without_reason_says_so() {
        let text = listing_message(ListingEvent::Rejected { reason: None }, "Sofa");
        assert!(text.content.ends_with("not specified"));
    }

    #[test]
    fn review_points_at_review_entity() {
        assert_eq!(NotificationKind::NewReview.entity_type(), "review");
        assert_eq!(NotificationKind::ListingExpired.entity_type(), "listing");
    }

    #[test]
    fn review_message_mentions_rating() {
        let text = review_message("alice", 4);
        assert_eq!(text.content, "alice left you a review rated 4/5.");
    }
}
