//! Listing search and title suggestions. Only `active` listings are visible.

use bazaar_core::search::{
    normalize_query, validate_price_range, MAX_SUGGESTIONS, MIN_SUGGESTION_QUERY_LEN,
};
use bazaar_db::models::listing::{ListingPage, ListingSearch};
use bazaar_db::repositories::ListingRepo;

use crate::error::EngineResult;
use crate::Engine;

impl Engine {
    /// Filtered, sorted, paginated search over active listings.
    ///
    /// Text filters match substrings case-insensitively; blank text filters
    /// are ignored.
    pub async fn search_listings(&self, mut params: ListingSearch) -> EngineResult<ListingPage> {
        validate_price_range(params.min_price, params.max_price)?;
        params.query = normalize_query(params.query.as_deref());
        params.location = normalize_query(params.location.as_deref());

        let page = ListingRepo::search(&self.pool, &params).await?;
        tracing::debug!(
            query = ?params.query,
            sort_by = params.sort_by.as_str(),
            total = page.total,
            "Listing search"
        );
        Ok(page)
    }

    /// Up to five distinct titles of active listings containing `query`.
    /// Queries shorter than two characters return nothing.
    pub async fn suggest_titles(&self, query: &str) -> EngineResult<Vec<String>> {
        let Some(term) = normalize_query(Some(query)) else {
            return Ok(Vec::new());
        };
        if term.chars().count() < MIN_SUGGESTION_QUERY_LEN {
            return Ok(Vec::new());
        }
        Ok(ListingRepo::suggest_titles(&self.pool, &term, MAX_SUGGESTIONS).await?)
    }
}
