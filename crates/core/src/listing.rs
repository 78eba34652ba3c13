//! Listing status machine, condition values, and input validation.
//!
//! Prices are stored as integer minor currency units (e.g. kopecks, cents).

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_SOLD: &str = "sold";
pub const STATUS_EXPIRED: &str = "expired";

/// All valid listing statuses. Must match the `listings.status` CHECK constraint.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_ACTIVE,
    STATUS_REJECTED,
    STATUS_SOLD,
    STATUS_EXPIRED,
];

/// Statuses that count towards a user's `listings_count`.
pub const COUNTED_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_ACTIVE];

/// Lifecycle state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    Pending,
    Active,
    Rejected,
    Sold,
    Expired,
}

impl ListingStatus {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::Active => STATUS_ACTIVE,
            Self::Rejected => STATUS_REJECTED,
            Self::Sold => STATUS_SOLD,
            Self::Expired => STATUS_EXPIRED,
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_PENDING => Ok(Self::Pending),
            STATUS_ACTIVE => Ok(Self::Active),
            STATUS_REJECTED => Ok(Self::Rejected),
            STATUS_SOLD => Ok(Self::Sold),
            STATUS_EXPIRED => Ok(Self::Expired),
            other => Err(CoreError::Validation(format!(
                "Unknown listing status: '{other}'. Valid statuses: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// Whether the status machine permits moving from `self` to `next`.
    ///
    /// Re-entering `pending` is the edit path: any listing that has not been
    /// sold goes back to moderation when its owner changes it.
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        match (self, next) {
            (Pending, Active) | (Pending, Rejected) => true,
            (Active, Sold) | (Active, Expired) => true,
            (Rejected, Sold) | (Rejected, Expired) => true,
            (Sold, _) => false,
            (_, Pending) => true,
            _ => false,
        }
    }

    /// Whether the listing is editable by its owner.
    pub fn is_editable(&self) -> bool {
        self.can_transition_to(ListingStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

pub const CONDITION_NEW: &str = "new";
pub const CONDITION_USED: &str = "used";
pub const CONDITION_BROKEN: &str = "broken";

/// All valid item conditions.
pub const VALID_CONDITIONS: &[&str] = &[CONDITION_NEW, CONDITION_USED, CONDITION_BROKEN];

/// Default condition when the caller does not provide one.
pub const DEFAULT_CONDITION: &str = CONDITION_USED;

/// Default currency code when the caller does not provide one.
pub const DEFAULT_CURRENCY: &str = "RUB";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LOCATION_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Borrowed view of the user-editable listing fields.
///
/// `None` means "not being changed" for partial updates; create passes
/// every required field as `Some`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListingFields<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<i64>,
    pub currency: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub location: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Validate a complete listing for creation.
///
/// Every field that `create` requires must be present. All problems are
/// reported together in a single [`CoreError::Validation`].
pub fn validate_new_listing(fields: &ListingFields<'_>) -> Result<(), CoreError> {
    let mut errors = collect_field_errors(fields);
    if fields.title.is_none() {
        errors.push("Title must not be empty".to_string());
    }
    if fields.description.is_none() {
        errors.push("Description must not be empty".to_string());
    }
    if fields.price.is_none() {
        errors.push("Price must be greater than zero".to_string());
    }
    if fields.location.is_none() {
        errors.push("Location is required".to_string());
    }
    into_result(errors)
}

/// Validate only the fields that are present (partial update).
pub fn validate_listing_patch(fields: &ListingFields<'_>) -> Result<(), CoreError> {
    into_result(collect_field_errors(fields))
}

fn collect_field_errors(fields: &ListingFields<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(title) = fields.title {
        if title.trim().is_empty() {
            errors.push("Title must not be empty".to_string());
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("Title must be at most {MAX_TITLE_LEN} characters"));
        }
    }
    if let Some(description) = fields.description {
        if description.trim().is_empty() {
            errors.push("Description must not be empty".to_string());
        }
    }
    if let Some(price) = fields.price {
        if price <= 0 {
            errors.push("Price must be greater than zero".to_string());
        }
    }
    if let Some(currency) = fields.currency {
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            errors.push(format!(
                "Currency must be a three-letter uppercase code, got '{currency}'"
            ));
        }
    }
    if let Some(condition) = fields.condition {
        if !VALID_CONDITIONS.contains(&condition) {
            errors.push(format!(
                "Invalid condition '{condition}'. Must be one of: {}",
                VALID_CONDITIONS.join(", ")
            ));
        }
    }
    if let Some(location) = fields.location {
        if location.trim().is_empty() {
            errors.push("Location is required".to_string());
        } else if location.chars().count() > MAX_LOCATION_LEN {
            errors.push(format!(
                "Location must be at most {MAX_LOCATION_LEN} characters"
            ));
        }
    }
    if let Some(lat) = fields.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            errors.push("Latitude must be between -90 and 90".to_string());
        }
    }
    if let Some(lon) = fields.longitude {
        if !(-180.0..=180.0).contains(&lon) {
            errors.push("Longitude must be between -180 and 180".to_string());
        }
    }

    errors
}

fn into_result(errors: Vec<String>) -> Result<(), CoreError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ListingFields<'static> {
        ListingFields {
            title: Some("Road bicycle"),
            description: Some("Lightly used, new tyres"),
            price: Some(100),
            currency: Some("RUB"),
            condition: Some("used"),
            location: Some("Kazan"),
            latitude: Some(55.79),
            longitude: Some(49.12),
        }
    }

    #[test]
    fn valid_listing_passes() {
        assert!(validate_new_listing(&valid()).is_ok());
    }

    #[test]
    fn zero_price_is_rejected() {
        let fields = ListingFields {
            price: Some(0),
            ..valid()
        };
        let err = validate_new_listing(&fields).unwrap_err();
        assert!(err.to_string().contains("Price must be greater than zero"));
    }

    #[test]
    fn blank_title_is_rejected() {
        let fields = ListingFields {
            title: Some("   "),
            ..valid()
        };
        assert!(validate_new_listing(&fields).is_err());
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = validate_new_listing(&ListingFields::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Title"));
        assert!(msg.contains("Description"));
        assert!(msg.contains("Price"));
        assert!(msg.contains("Location"));
    }

    #[test]
    fn patch_ignores_absent_fields() {
        let patch = ListingFields {
            price: Some(250),
            ..ListingFields::default()
        };
        assert!(validate_listing_patch(&patch).is_ok());
    }

    #[test]
    fn patch_still_checks_present_fields() {
        let patch = ListingFields {
            price: Some(-5),
            ..ListingFields::default()
        };
        assert!(validate_listing_patch(&patch).is_err());
    }

    #[test]
    fn bad_currency_and_condition_are_rejected() {
        let fields = ListingFields {
            currency: Some("rub"),
            condition: Some("mint"),
            ..valid()
        };
        let msg = validate_new_listing(&fields).unwrap_err().to_string();
        assert!(msg.contains("Currency"));
        assert!(msg.contains("Invalid condition"));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let fields = ListingFields {
            latitude: Some(91.0),
            longitude: Some(-181.0),
            ..valid()
        };
        let msg = validate_new_listing(&fields).unwrap_err().to_string();
        assert!(msg.contains("Latitude"));
        assert!(msg.contains("Longitude"));
    }

    #[test]
    fn moderation_transitions_only_leave_pending() {
        assert!(ListingStatus::Pending.can_transition_to(ListingStatus::Active));
        assert!(ListingStatus::Pending.can_transition_to(ListingStatus::Rejected));
        assert!(!ListingStatus::Active.can_transition_to(ListingStatus::Rejected));
        assert!(!ListingStatus::Rejected.can_transition_to(ListingStatus::Active));
    }

    #[test]
    fn sold_is_final() {
        for next in [
            ListingStatus::Pending,
            ListingStatus::Active,
            ListingStatus::Expired,
        ] {
            assert!(!ListingStatus::Sold.can_transition_to(next));
        }
        assert!(!ListingStatus::Sold.is_editable());
    }

    #[test]
    fn edits_return_to_pending() {
        assert!(ListingStatus::Active.is_editable());
        assert!(ListingStatus::Rejected.is_editable());
        assert!(ListingStatus::Expired.is_editable());
    }

    #[test]
    fn status_strings_round_trip() {
        for s in VALID_STATUSES {
            assert_eq!(ListingStatus::from_str(s).unwrap().as_str(), *s);
        }
        assert!(ListingStatus::from_str("deleted").is_err());
    }
}
