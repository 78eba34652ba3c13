//! Listing entity model, DTOs, and search types.

use bazaar_core::listing::ListingFields;
use bazaar_core::search::SortBy;
use bazaar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `listings` table. `price` is in minor currency units.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub id: DbId,
    pub owner_id: DbId,
    pub category_id: DbId,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub condition: String,
    pub status: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_negotiable: bool,
    pub is_urgent: bool,
    pub views_count: i32,
    pub favorites_count: i32,
    pub published_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub sold_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for inserting a listing. New listings always start `pending`.
#[derive(Debug, Clone)]
pub struct CreateListing {
    pub owner_id: DbId,
    pub category_id: DbId,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub condition: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_negotiable: bool,
    pub is_urgent: bool,
    pub expires_at: Option<Timestamp>,
}

impl CreateListing {
    pub fn fields(&self) -> ListingFields<'_> {
        ListingFields {
            title: Some(&self.title),
            description: Some(&self.description),
            price: Some(self.price),
            currency: Some(&self.currency),
            condition: Some(&self.condition),
            location: Some(&self.location),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateListing {
    pub category_id: Option<DbId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub condition: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_negotiable: Option<bool>,
    pub is_urgent: Option<bool>,
    pub expires_at: Option<Timestamp>,
}

impl UpdateListing {
    pub fn fields(&self) -> ListingFields<'_> {
        ListingFields {
            title: self.title.as_deref(),
            description: self.description.as_deref(),
            price: self.price,
            currency: None,
            condition: self.condition.as_deref(),
            location: self.location.as_deref(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Filters for listing search. Only `active` listings are ever returned.
#[derive(Debug, Clone, Default)]
pub struct ListingSearch {
    pub query: Option<String>,
    pub category_id: Option<DbId>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub location: Option<String>,
    pub sort_by: SortBy,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One row of a search result page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ListingSummary {
    pub id: DbId,
    pub title: String,
    pub price: i64,
    pub currency: String,
    pub condition: String,
    pub location: String,
    pub is_urgent: bool,
    pub views_count: i32,
    pub favorites_count: i32,
    pub category_id: DbId,
    pub category_name: String,
    pub owner_id: DbId,
    pub owner_username: String,
    pub created_at: Timestamp,
}

/// A page of search results plus the unpaged match count.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub items: Vec<ListingSummary>,
    pub total: i64,
}
