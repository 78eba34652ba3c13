//! Repository for the `categories` table.

use bazaar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::category::{Category, CreateCategory};

const COLUMNS: &str =
    "id, name, slug, description, parent_id, is_active, sort_order, created_at";

pub struct CategoryRepo;

impl CategoryRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateCategory,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (name, slug, description, parent_id, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.parent_id)
            .bind(input.sort_order)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Active categories in display order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM categories WHERE is_active = TRUE ORDER BY sort_order, name"
        );
        sqlx::query_as::<_, Category>(&query).fetch_all(pool).await
    }

    pub async fn set_active(
        conn: &mut PgConnection,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query =
            format!("UPDATE categories SET is_active = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&mut *conn)
            .await
    }
}
