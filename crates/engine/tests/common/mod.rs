//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use bazaar_db::models::category::{Category, CreateCategory};
use bazaar_db::models::user::User;
use bazaar_db::repositories::{CategoryRepo, UserRepo};
use bazaar_engine::config::EngineConfig;
use bazaar_engine::listings::NewListing;
use bazaar_engine::Engine;
use sqlx::PgPool;

pub const PASSWORD: &str = "hunter2-but-longer";

pub fn engine(pool: PgPool) -> Engine {
    Engine::new(pool, EngineConfig::default())
}

/// Sign up `name`; any role other than `user` is then written straight to
/// the row, since sign-up itself never grants one.
pub async fn register(engine: &Engine, name: &str, role: &str) -> User {
    let user = engine
        .register_user(name, &format!("{name}@example.com"), PASSWORD)
        .await
        .unwrap();
    if role == "user" {
        return user;
    }
    let mut conn = engine.pool().acquire().await.unwrap();
    UserRepo::set_role(&mut conn, user.id, role)
        .await
        .unwrap()
        .unwrap()
}

pub async fn category(pool: &PgPool, slug: &str) -> Category {
    let mut conn = pool.acquire().await.unwrap();
    CategoryRepo::create(
        &mut conn,
        &CreateCategory {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            description: None,
            parent_id: None,
            sort_order: 0,
        },
    )
    .await
    .unwrap()
}

pub fn listing_input(category_id: i64, title: &str, price: i64) -> NewListing {
    NewListing {
        category_id,
        title: title.to_string(),
        description: format!("{title}, barely used"),
        price,
        location: "Novosibirsk".to_string(),
        ..Default::default()
    }
}

pub async fn activity_count(pool: &PgPool, action: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM user_activity_log WHERE action = $1")
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn listing_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM listings")
        .fetch_one(pool)
        .await
        .unwrap()
}
