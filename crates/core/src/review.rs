//! Review input rules.

use crate::error::CoreError;
use crate::types::DbId;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Ratings at or above this value are stored with `is_positive = true`.
pub const POSITIVE_RATING_THRESHOLD: i32 = 4;

/// Derive the stored `is_positive` flag from a rating.
pub fn is_positive(rating: i32) -> bool {
    rating >= POSITIVE_RATING_THRESHOLD
}

/// Validate a rating value.
pub fn validate_rating(rating: i32) -> Result<(), CoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}

/// Validate a comment body.
pub fn validate_comment(comment: &str) -> Result<(), CoreError> {
    if comment.trim().is_empty() {
        return Err(CoreError::Validation("Comment must not be empty".into()));
    }
    Ok(())
}

/// Validate a new review before any lookup happens.
pub fn validate_new_review(
    reviewer_id: DbId,
    reviewed_user_id: DbId,
    rating: i32,
    comment: &str,
) -> Result<(), CoreError> {
    if reviewer_id == reviewed_user_id {
        return Err(CoreError::Validation(
            "Users cannot review themselves".into(),
        ));
    }
    validate_rating(rating)?;
    validate_comment(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn positive_threshold() {
        assert!(!is_positive(3));
        assert!(is_positive(4));
        assert!(is_positive(5));
    }

    #[test]
    fn self_review_is_rejected() {
        let err = validate_new_review(3, 3, 5, "great").unwrap_err();
        assert!(err.to_string().contains("themselves"));
    }

    #[test]
    fn empty_comment_is_rejected() {
        assert!(validate_new_review(1, 2, 5, "  ").is_err());
        assert!(validate_new_review(1, 2, 5, "Fast shipping").is_ok());
    }
}
