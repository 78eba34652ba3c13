//! Listing search parameters: sort orders, paging bounds, and pattern
//! escaping for `ILIKE` substring matching.

use crate::error::CoreError;

/// Page size used when the caller passes none.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Shortest query that produces title suggestions.
pub const MIN_SUGGESTION_QUERY_LEN: usize = 2;

/// Maximum number of title suggestions returned.
pub const MAX_SUGGESTIONS: i64 = 5;

pub const SORT_NEWEST: &str = "newest";
pub const SORT_OLDEST: &str = "oldest";
pub const SORT_PRICE_LOW: &str = "price_low";
pub const SORT_PRICE_HIGH: &str = "price_high";
pub const SORT_POPULAR: &str = "popular";

/// Result ordering for listing search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    Popular,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => SORT_NEWEST,
            Self::Oldest => SORT_OLDEST,
            Self::PriceLow => SORT_PRICE_LOW,
            Self::PriceHigh => SORT_PRICE_HIGH,
            Self::Popular => SORT_POPULAR,
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            SORT_NEWEST => Ok(Self::Newest),
            SORT_OLDEST => Ok(Self::Oldest),
            SORT_PRICE_LOW => Ok(Self::PriceLow),
            SORT_PRICE_HIGH => Ok(Self::PriceHigh),
            SORT_POPULAR => Ok(Self::Popular),
            _ => Err(CoreError::Validation(format!("Unknown sort order: '{s}'"))),
        }
    }

    /// `ORDER BY` clause over the `l` alias of the listings table.
    ///
    /// Every ordering ends on `l.id` so paging is stable.
    pub fn order_by_clause(&self) -> &'static str {
        match self {
            Self::Newest => "l.created_at DESC, l.id DESC",
            Self::Oldest => "l.created_at ASC, l.id ASC",
            Self::PriceLow => "l.price ASC, l.id ASC",
            Self::PriceHigh => "l.price DESC, l.id DESC",
            Self::Popular => "l.views_count DESC, l.favorites_count DESC, l.id DESC",
        }
    }
}

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Negative offsets become zero.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Trim a free-text query; blank input means "no filter".
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

/// Wrap `term` in `%` for a substring `ILIKE`, escaping the pattern
/// metacharacters so user input matches literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Reject negative bounds and inverted price ranges.
pub fn validate_price_range(min: Option<i64>, max: Option<i64>) -> Result<(), CoreError> {
    if min.is_some_and(|m| m < 0) || max.is_some_and(|m| m < 0) {
        return Err(CoreError::Validation(
            "Price bounds must not be negative".to_string(),
        ));
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(CoreError::Validation(format!(
                "Minimum price {lo} exceeds maximum price {hi}"
            )));
        }
    }
    Ok(())
}
