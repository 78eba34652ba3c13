//! Repository for the `listings` table.

use bazaar_core::listing::{STATUS_ACTIVE, STATUS_EXPIRED, STATUS_PENDING, STATUS_SOLD};
use bazaar_core::search::{clamp_limit, clamp_offset, like_pattern};
use bazaar_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::listing::{
    CreateListing, Listing, ListingPage, ListingSearch, ListingSummary, UpdateListing,
};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, owner_id, category_id, title, description, price, currency, condition, \
    status, location, latitude, longitude, is_negotiable, is_urgent, \
    views_count, favorites_count, published_at, expires_at, sold_at, \
    created_at, updated_at";

/// Columns for search result rows (`l` = listings, `c` = categories, `u` = users).
const SUMMARY_COLUMNS: &str = "\
    l.id, l.title, l.price, l.currency, l.condition, l.location, l.is_urgent, \
    l.views_count, l.favorites_count, l.category_id, c.name AS category_name, \
    l.owner_id, u.username AS owner_username, l.created_at";

const SEARCH_FROM: &str = "\
    FROM listings l \
    JOIN categories c ON c.id = l.category_id \
    JOIN users u ON u.id = l.owner_id";

// ---------------------------------------------------------------------------
// ListingRepo
// ---------------------------------------------------------------------------

pub struct ListingRepo;

impl ListingRepo {
    /// Insert a new listing in `pending` status.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateListing,
    ) -> Result<Listing, sqlx::Error> {
        let query = format!(
            "INSERT INTO listings
                (owner_id, category_id, title, description, price, currency, condition,
                 status, location, latitude, longitude, is_negotiable, is_urgent, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, '{STATUS_PENDING}', $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(input.owner_id)
            .bind(input.category_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(&input.currency)
            .bind(&input.condition)
            .bind(&input.location)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.is_negotiable)
            .bind(input.is_urgent)
            .bind(input.expires_at)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM listings WHERE id = $1");
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a listing and lock its row until the transaction ends.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM listings WHERE id = $1 FOR NO KEY UPDATE");
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Apply a partial update and send the listing back to `pending`.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateListing,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!(
            "UPDATE listings SET
                category_id = COALESCE($2, category_id),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                condition = COALESCE($6, condition),
                location = COALESCE($7, location),
                latitude = COALESCE($8, latitude),
                longitude = COALESCE($9, longitude),
                is_negotiable = COALESCE($10, is_negotiable),
                is_urgent = COALESCE($11, is_urgent),
                expires_at = COALESCE($12, expires_at),
                status = '{STATUS_PENDING}',
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .bind(input.category_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(&input.condition)
            .bind(&input.location)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.is_negotiable)
            .bind(input.is_urgent)
            .bind(input.expires_at)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Move a `pending` listing to `next_status`.
    ///
    /// The status check is part of the `UPDATE`, so of two concurrent callers
    /// only one sees a row come back. Approval stamps `published_at`.
    pub async fn transition_from_pending(
        conn: &mut PgConnection,
        id: DbId,
        next_status: &str,
        at: Timestamp,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!(
            "UPDATE listings SET
                status = $2,
                published_at = CASE WHEN $2 = '{STATUS_ACTIVE}' THEN $3 ELSE published_at END,
                updated_at = $3
             WHERE id = $1 AND status = '{STATUS_PENDING}'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .bind(next_status)
            .bind(at)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Mark an `active` listing as sold.
    pub async fn mark_sold(
        conn: &mut PgConnection,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!(
            "UPDATE listings SET status = '{STATUS_SOLD}', sold_at = $2, updated_at = $2
             WHERE id = $1 AND status = '{STATUS_ACTIVE}'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Hard-delete a listing. Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_views(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE listings SET views_count = views_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Shift `favorites_count` by `delta`, never below zero.
    pub async fn adjust_favorites(
        conn: &mut PgConnection,
        id: DbId,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE listings SET favorites_count = GREATEST(favorites_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Expire up to `batch_size` active listings that are past their explicit
    /// `expires_at` or were published before `published_before`.
    ///
    /// Rows locked by another sweep are skipped, so concurrent sweeps never
    /// expire the same listing twice.
    pub async fn expire_due(
        conn: &mut PgConnection,
        now: Timestamp,
        published_before: Timestamp,
        batch_size: i64,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        let query = format!(
            "UPDATE listings SET status = '{STATUS_EXPIRED}', updated_at = $1
             WHERE status = '{STATUS_ACTIVE}' AND id IN (
                SELECT id FROM listings
                WHERE status = '{STATUS_ACTIVE}'
                  AND ((expires_at IS NOT NULL AND expires_at <= $1)
                       OR COALESCE(published_at, created_at) <= $2)
                ORDER BY id
                LIMIT $3
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(now)
            .bind(published_before)
            .bind(batch_size)
            .fetch_all(&mut *conn)
            .await
    }

    /// Pending listings, oldest first.
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM listings WHERE status = '{STATUS_PENDING}'
             ORDER BY created_at ASC, id ASC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Listing>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM listings WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Search active listings with filtering, ordering, and pagination.
    pub async fn search(pool: &PgPool, params: &ListingSearch) -> Result<ListingPage, sqlx::Error> {
        let limit = clamp_limit(params.limit);
        let offset = clamp_offset(params.offset);

        let (where_clause, bind_values, bind_idx) = build_search_filter(params);

        let query = format!(
            "SELECT {SUMMARY_COLUMNS} {SEARCH_FROM} {where_clause} \
             ORDER BY {} \
             LIMIT ${bind_idx} OFFSET ${}",
            params.sort_by.order_by_clause(),
            bind_idx + 1
        );
        let mut q = sqlx::query_as::<_, ListingSummary>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
            };
        }
        let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

        let count_query = format!("SELECT COUNT(*)::BIGINT {SEARCH_FROM} {where_clause}");
        let mut cq = sqlx::query_scalar::<_, i64>(&count_query);
        for val in &bind_values {
            cq = match val {
                BindValue::BigInt(v) => cq.bind(*v),
                BindValue::Text(v) => cq.bind(v.as_str()),
            };
        }
        let total = cq.fetch_one(pool).await?;

        Ok(ListingPage { items, total })
    }

    /// Distinct titles of active listings containing `term`.
    pub async fn suggest_titles(
        pool: &PgPool,
        term: &str,
        limit: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT title FROM listings
             WHERE status = '{STATUS_ACTIVE}' AND title ILIKE $1
             ORDER BY title
             LIMIT $2"
        );
        sqlx::query_scalar::<_, String>(&query)
            .bind(like_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built search queries.
enum BindValue {
    BigInt(i64),
    Text(String),
}

/// Build a WHERE clause and bind values from search filters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. Only `active`
/// listings are ever matched.
fn build_search_filter(params: &ListingSearch) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec![format!("l.status = '{STATUS_ACTIVE}'")];
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(ref text) = params.query {
        conditions.push(format!(
            "(l.title ILIKE ${bind_idx} OR l.description ILIKE ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(like_pattern(text)));
    }

    if let Some(category_id) = params.category_id {
        conditions.push(format!("l.category_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(category_id));
    }

    if let Some(min_price) = params.min_price {
        conditions.push(format!("l.price >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(min_price));
    }

    if let Some(max_price) = params.max_price {
        conditions.push(format!("l.price <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(max_price));
    }

    if let Some(ref location) = params.location {
        conditions.push(format!("l.location ILIKE ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(like_pattern(location)));
    }

    (
        format!("WHERE {}", conditions.join(" AND ")),
        bind_values,
        bind_idx,
    )
}
