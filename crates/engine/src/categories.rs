//! Category administration.

use bazaar_core::audit::{actions, entity_types};
use bazaar_core::error::CoreError;
use bazaar_core::roles::Permission;
use bazaar_core::types::DbId;
use bazaar_db::models::category::{Category, CreateCategory};
use bazaar_db::repositories::CategoryRepo;
use sqlx::PgConnection;

use crate::authorizer;
use crate::error::{conflict_on, EngineResult};
use crate::logging::{activity, ActivityLogger};
use crate::Engine;

fn validate_category(input: &CreateCategory) -> Result<(), CoreError> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Category name must not be empty".into()));
    }
    let slug_ok = !input.slug.is_empty()
        && input
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
        return Err(CoreError::Validation(format!(
            "Invalid slug '{}': use lowercase letters, digits and '-'",
            input.slug
        )));
    }
    Ok(())
}

impl Engine {
    /// Create a category. Requires `manage_categories`.
    pub async fn create_category(
        &self,
        actor_id: DbId,
        input: &CreateCategory,
    ) -> EngineResult<Category> {
        validate_category(input)?;

        let mut tx = self.pool.begin().await?;
        let result = create_category_in(&mut tx, actor_id, input).await;
        let category = self
            .finish(tx, result, Some(actor_id), actions::CREATE_CATEGORY)
            .await?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Enable or disable a category. Listings cannot be created in an
    /// inactive category.
    pub async fn set_category_active(
        &self,
        actor_id: DbId,
        category_id: DbId,
        is_active: bool,
    ) -> EngineResult<Category> {
        let mut tx = self.pool.begin().await?;
        let result = set_category_active_in(&mut tx, actor_id, category_id, is_active).await;
        self.finish(tx, result, Some(actor_id), actions::UPDATE_CATEGORY)
            .await
    }

    pub async fn list_categories(&self) -> EngineResult<Vec<Category>> {
        Ok(CategoryRepo::list_active(&self.pool).await?)
    }
}

async fn create_category_in(
    conn: &mut PgConnection,
    actor_id: DbId,
    input: &CreateCategory,
) -> EngineResult<Category> {
    authorizer::require(conn, actor_id, Permission::ManageCategories, None).await?;

    if let Some(parent_id) = input.parent_id {
        if CategoryRepo::find_by_id(conn, parent_id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "Category",
                id: parent_id,
            }
            .into());
        }
    }

    let category = CategoryRepo::create(conn, input)
        .await
        .map_err(conflict_on("uq_categories_slug", "Category slug is already in use"))?;

    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::CREATE_CATEGORY,
            entity_types::CATEGORY,
            category.id,
            Some(serde_json::json!({ "slug": category.slug })),
        ),
    )
    .await;
    Ok(category)
}

async fn set_category_active_in(
    conn: &mut PgConnection,
    actor_id: DbId,
    category_id: DbId,
    is_active: bool,
) -> EngineResult<Category> {
    authorizer::require(conn, actor_id, Permission::ManageCategories, None).await?;
    let category = CategoryRepo::set_active(conn, category_id, is_active)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Category",
            id: category_id,
        })?;
    ActivityLogger::record(
        conn,
        activity(
            Some(actor_id),
            actions::UPDATE_CATEGORY,
            entity_types::CATEGORY,
            category.id,
            Some(serde_json::json!({ "is_active": is_active })),
        ),
    )
    .await;
    Ok(category)
}
