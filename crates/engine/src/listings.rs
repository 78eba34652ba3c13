//! Listing lifecycle manager.
//!
//! Every mutation runs in one transaction covering the listing write, the
//! owner's statistics recompute, the audit snapshot, and the activity entry.
//! Input validation runs before the transaction opens, so a rejected listing
//! leaves no trace.

use bazaar_core::audit::{actions, audited_tables, entity_types, AuditOperation};
use bazaar_core::error::CoreError;
use bazaar_core::listing::{
    validate_listing_patch, validate_new_listing, ListingStatus, DEFAULT_CONDITION,
    DEFAULT_CURRENCY,
};
use bazaar_core::roles::{Permission, Subject};
use bazaar_core::types::{DbId, Timestamp};
use bazaar_db::models::listing::{CreateListing, Listing, UpdateListing};
use bazaar_db::repositories::{CategoryRepo, FavoriteRepo, ListingRepo};
use chrono::Utc;
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::EngineResult;
use crate::logging::{activity, ActivityLogger, AuditLogger};
use crate::statistics;
use crate::Engine;

/// Caller input for a new listing. Unset currency and condition fall back
/// to the marketplace defaults.
#[derive(Debug, Clone, Default)]
pub struct NewListing {
    pub category_id: DbId,
    pub title: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub currency: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_negotiable: bool,
    pub is_urgent: bool,
    pub expires_at: Option<Timestamp>,
}

impl NewListing {
    fn into_create(self, owner_id: DbId) -> CreateListing {
        CreateListing {
            owner_id,
            category_id: self.category_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            currency: self
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            condition: self
                .condition
                .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
            location: self.location.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            is_negotiable: self.is_negotiable,
            is_urgent: self.is_urgent,
            expires_at: self.expires_at,
        }
    }
}

fn listing_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Listing",
        id,
    }
}

impl Engine {
    /// Create a listing in `pending` status.
    ///
    /// The owner must be active and the category must exist and be active;
    /// either failing is a validation error.
    pub async fn create_listing(&self, owner_id: DbId, input: NewListing) -> EngineResult<Listing> {
        let input = input.into_create(owner_id);
        validate_new_listing(&input.fields())?;

        let mut tx = self.pool.begin().await?;
        let result = create_in(&mut tx, &input).await;
        let listing = self
            .finish(tx, result, Some(owner_id), actions::CREATE_LISTING)
            .await?;

        tracing::info!(listing_id = listing.id, owner_id, price = listing.price, "Listing created");
        Ok(listing)
    }

    /// Apply a partial edit. Only the owner may edit. The listing goes back
    /// to `pending` for re-moderation. Sold listings cannot be edited.
    pub async fn update_listing(
        &self,
        listing_id: DbId,
        actor_id: DbId,
        patch: &UpdateListing,
    ) -> EngineResult<Listing> {
        validate_listing_patch(&patch.fields())?;

        let mut tx = self.pool.begin().await?;
        let result = update_in(&mut tx, listing_id, actor_id, patch).await;
        let listing = self
            .finish(tx, result, Some(actor_id), actions::UPDATE_LISTING)
            .await?;

        tracing::info!(listing_id, actor_id, "Listing updated");
        Ok(listing)
    }

    /// Remove a listing. Owners may delete their own; moderators and admins
    /// may delete any.
    pub async fn delete_listing(&self, listing_id: DbId, actor_id: DbId) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = delete_in(&mut tx, listing_id, actor_id).await;
        self.finish(tx, result, Some(actor_id), actions::DELETE_LISTING)
            .await?;

        tracing::info!(listing_id, actor_id, "Listing deleted");
        Ok(())
    }

    /// Close an active listing as sold.
    pub async fn mark_sold(&self, listing_id: DbId, actor_id: DbId) -> EngineResult<Listing> {
        let mut tx = self.pool.begin().await?;
        let result = mark_sold_in(&mut tx, listing_id, actor_id, Utc::now()).await;
        let listing = self
            .finish(tx, result, Some(actor_id), actions::MARK_SOLD)
            .await?;

        tracing::info!(listing_id, actor_id, price = listing.price, "Listing sold");
        Ok(listing)
    }

    /// Count a view. Owners looking at their own listing are not counted.
    ///
    /// Returns whether the view was counted.
    pub async fn record_view(&self, listing_id: DbId, viewer_id: Option<DbId>) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = record_view_in(&mut tx, listing_id, viewer_id).await;
        self.finish(tx, result, viewer_id, actions::VIEW_LISTING)
            .await
    }

    /// Add the listing to the user's favorites, or remove it if it is
    /// already there. Returns `true` when the listing is now a favorite.
    pub async fn toggle_favorite(&self, listing_id: DbId, user_id: DbId) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = toggle_favorite_in(&mut tx, listing_id, user_id).await;
        self.finish(tx, result, Some(user_id), actions::TOGGLE_FAVORITE)
            .await
    }

    pub async fn find_listing(&self, listing_id: DbId) -> EngineResult<Listing> {
        let mut conn = self.pool.acquire().await?;
        ListingRepo::find_by_id(&mut conn, listing_id)
            .await?
            .ok_or_else(|| listing_not_found(listing_id).into())
    }

    pub async fn listings_by_owner(&self, owner_id: DbId) -> EngineResult<Vec<Listing>> {
        Ok(ListingRepo::list_by_owner(&self.pool, owner_id).await?)
    }

    pub async fn favorite_listing_ids(&self, user_id: DbId) -> EngineResult<Vec<DbId>> {
        Ok(FavoriteRepo::list_for_user(&self.pool, user_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Transaction bodies
// ---------------------------------------------------------------------------

async fn create_in(conn: &mut PgConnection, input: &CreateListing) -> EngineResult<Listing> {
    let owner = authorizer::lock_subject(conn, input.owner_id).await?;
    if !owner.is_some_and(|s| s.is_active) {
        return Err(CoreError::Validation("Owner account is missing or inactive".into()).into());
    }
    authorizer::ensure(owner.as_ref(), Permission::CreateListing, None)?;
    ensure_category_usable(conn, input.category_id).await?;

    let listing = ListingRepo::create(conn, input).await?;
    statistics::refresh(conn, listing.owner_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::LISTINGS,
        AuditOperation::Insert,
        listing.id,
        Some(listing.owner_id),
        None,
        Some(&listing),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(listing.owner_id),
            actions::CREATE_LISTING,
            entity_types::LISTING,
            listing.id,
            Some(serde_json::json!({ "title": listing.title, "price": listing.price })),
        ),
    )
    .await;
    Ok(listing)
}

async fn update_in(
    conn: &mut PgConnection,
    listing_id: DbId,
    actor_id: DbId,
    patch: &UpdateListing,
) -> EngineResult<Listing> {
    let actor = authorizer::lock_subject(conn, actor_id).await?;
    let before = lock_listing(conn, listing_id).await?;
    ensure_owner_edit(actor.as_ref(), &before)?;

    if !ListingStatus::from_str(&before.status)?.is_editable() {
        return Err(CoreError::InvalidState(format!(
            "Listing is '{}' and can no longer be edited",
            before.status
        ))
        .into());
    }
    if let Some(category_id) = patch.category_id {
        ensure_category_usable(conn, category_id).await?;
    }

    let after = ListingRepo::update(conn, listing_id, patch)
        .await?
        .ok_or_else(|| listing_not_found(listing_id))?;
    statistics::refresh(conn, after.owner_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::LISTINGS,
        AuditOperation::Update,
        after.id,
        Some(actor_id),
        Some(&before),
        Some(&after),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::UPDATE_LISTING,
            entity_types::LISTING,
            after.id,
            Some(serde_json::json!({ "previous_status": before.status })),
        ),
    )
    .await;
    Ok(after)
}

async fn delete_in(conn: &mut PgConnection, listing_id: DbId, actor_id: DbId) -> EngineResult<()> {
    let actor = authorizer::lock_subject(conn, actor_id).await?;
    let listing = lock_listing(conn, listing_id).await?;
    authorizer::ensure_owner_or_staff(
        actor.as_ref(),
        Permission::DeleteOwnListing,
        Some(listing.owner_id),
    )?;

    if !ListingRepo::delete(conn, listing_id).await? {
        return Err(listing_not_found(listing_id).into());
    }
    statistics::refresh(conn, listing.owner_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::LISTINGS,
        AuditOperation::Delete,
        listing.id,
        Some(actor_id),
        Some(&listing),
        None,
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::DELETE_LISTING,
            entity_types::LISTING,
            listing.id,
            Some(serde_json::json!({ "owner_id": listing.owner_id, "title": listing.title })),
        ),
    )
    .await;
    Ok(())
}

async fn mark_sold_in(
    conn: &mut PgConnection,
    listing_id: DbId,
    actor_id: DbId,
    now: Timestamp,
) -> EngineResult<Listing> {
    let actor = authorizer::lock_subject(conn, actor_id).await?;
    let before = lock_listing(conn, listing_id).await?;
    ensure_owner_edit(actor.as_ref(), &before)?;

    let after = ListingRepo::mark_sold(conn, listing_id, now)
        .await?
        .ok_or_else(|| {
            CoreError::InvalidState(format!(
                "Listing is '{}', only active listings can be marked sold",
                before.status
            ))
        })?;
    statistics::refresh(conn, after.owner_id).await?;

    AuditLogger::record(
        conn,
        audited_tables::LISTINGS,
        AuditOperation::Update,
        after.id,
        Some(actor_id),
        Some(&before),
        Some(&after),
    )
    .await;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::MARK_SOLD,
            entity_types::LISTING,
            after.id,
            Some(serde_json::json!({ "price": after.price })),
        ),
    )
    .await;
    Ok(after)
}

async fn record_view_in(
    conn: &mut PgConnection,
    listing_id: DbId,
    viewer_id: Option<DbId>,
) -> EngineResult<bool> {
    let listing = ListingRepo::find_by_id(conn, listing_id)
        .await?
        .ok_or_else(|| listing_not_found(listing_id))?;
    if viewer_id == Some(listing.owner_id) {
        return Ok(false);
    }

    ListingRepo::increment_views(conn, listing_id).await?;
    ActivityLogger::record(
        conn,
        activity(
            viewer_id,
            actions::VIEW_LISTING,
            entity_types::LISTING,
            listing_id,
            None,
        ),
    )
    .await;
    Ok(true)
}

async fn toggle_favorite_in(
    conn: &mut PgConnection,
    listing_id: DbId,
    user_id: DbId,
) -> EngineResult<bool> {
    authorizer::require(conn, user_id, Permission::ManageFavorites, None).await?;
    lock_listing(conn, listing_id).await?;

    let favorited = if FavoriteRepo::add(conn, user_id, listing_id).await? {
        ListingRepo::adjust_favorites(conn, listing_id, 1).await?;
        true
    } else {
        FavoriteRepo::remove(conn, user_id, listing_id).await?;
        ListingRepo::adjust_favorites(conn, listing_id, -1).await?;
        false
    };

    ActivityLogger::record(
        conn,
        activity(
            Some(user_id),
            actions::TOGGLE_FAVORITE,
            entity_types::LISTING,
            listing_id,
            Some(serde_json::json!({ "favorited": favorited })),
        ),
    )
    .await;
    Ok(favorited)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn lock_listing(conn: &mut PgConnection, listing_id: DbId) -> EngineResult<Listing> {
    ListingRepo::find_by_id_for_update(conn, listing_id)
        .await?
        .ok_or_else(|| listing_not_found(listing_id).into())
}

/// Edits and sales belong to the owner alone. Staff rights do not extend
/// to rewriting someone else's listing.
fn ensure_owner_edit(actor: Option<&Subject>, listing: &Listing) -> Result<(), CoreError> {
    authorizer::ensure(actor, Permission::EditOwnListing, Some(listing.owner_id))?;
    if actor.map(|s| s.user_id) != Some(listing.owner_id) {
        return Err(CoreError::Forbidden(format!(
            "Listing {} belongs to another user",
            listing.id
        )));
    }
    Ok(())
}

async fn ensure_category_usable(conn: &mut PgConnection, category_id: DbId) -> EngineResult<()> {
    match CategoryRepo::find_by_id(conn, category_id).await? {
        Some(category) if category.is_active => Ok(()),
        Some(_) => Err(CoreError::Validation(format!("Category {category_id} is inactive")).into()),
        None => Err(CoreError::Validation(format!("Category {category_id} does not exist")).into()),
    }
}
