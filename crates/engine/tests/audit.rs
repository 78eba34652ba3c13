//! Audit chain, activity log access, permission checks, and retention.

mod common;

use assert_matches::assert_matches;
use bazaar_core::audit::{audited_tables, entity_types};
use bazaar_db::models::activity::ActivityQuery;
use bazaar_db::models::audit::AuditQuery;
use bazaar_engine::error::ErrorKind;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use common::{category, engine, listing_input, register};

#[sqlx::test(migrations = "../db/migrations")]
async fn test_audit_chain_verifies_and_detects_tampering(pool: PgPool) {
    let engine = engine(pool.clone());
    let admin = register(&engine, "root", "admin").await;
    let owner = register(&engine, "olga", "user").await;
    let cat = category(&pool, "books").await;
    let listing = engine
        .create_listing(owner.id, listing_input(cat.id, "Dune", 700))
        .await
        .unwrap();
    engine
        .moderate_listing(listing.id, admin.id, "approve", None)
        .await
        .unwrap();

    let check = engine.verify_audit_chain(admin.id).await.unwrap();
    // Two registrations, one listing insert, one moderation update.
    assert_eq!(check.verified_entries, 4);
    assert!(check.chain_valid);
    assert_eq!(check.first_break, None);

    let page = engine
        .query_audit_log(
            admin.id,
            &AuditQuery {
                table_name: Some(audited_tables::LISTINGS.to_string()),
                record_id: Some(listing.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let target = page.items.iter().map(|e| e.id).min().unwrap();

    sqlx::query("UPDATE audit_log SET new_data = jsonb_set(new_data, '{price}', '1') WHERE id = $1")
        .bind(target)
        .execute(&pool)
        .await
        .unwrap();

    let check = engine.verify_audit_chain(admin.id).await.unwrap();
    assert!(!check.chain_valid);
    assert_eq!(check.first_break, Some(target));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_user_snapshots_are_redacted(pool: PgPool) {
    let engine = engine(pool.clone());
    let admin = register(&engine, "root", "admin").await;

    let page = engine
        .query_audit_log(
            admin.id,
            &AuditQuery {
                table_name: Some(audited_tables::USERS.to_string()),
                record_id: Some(admin.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    let snapshot = page.items[0].new_data.as_ref().unwrap();
    assert_ne!(snapshot["password_hash"], admin.password_hash.as_str());
    assert_eq!(snapshot["username"], "root");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_log_access_rules(pool: PgPool) {
    let engine = engine(pool.clone());
    let admin = register(&engine, "root", "admin").await;
    let user = register(&engine, "olga", "user").await;
    let moderator = register(&engine, "mod", "moderator").await;

    let verify = engine.verify_audit_chain(moderator.id).await;
    assert_matches!(verify, Err(e) if e.kind() == ErrorKind::Permission);
    let audit = engine.query_audit_log(user.id, &AuditQuery::default()).await;
    assert_matches!(audit, Err(e) if e.kind() == ErrorKind::Permission);

    let own = engine
        .list_activity(
            user.id,
            &ActivityQuery {
                user_id: Some(user.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!own.is_empty());
    assert!(own.iter().all(|e| e.user_id == Some(user.id)));

    let others = engine
        .list_activity(
            user.id,
            &ActivityQuery {
                user_id: Some(admin.id),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(others, Err(e) if e.kind() == ErrorKind::Permission);

    let everyone = engine
        .list_activity(admin.id, &ActivityQuery::default())
        .await
        .unwrap();
    assert!(everyone.len() >= 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_check_permission(pool: PgPool) {
    let engine = engine(pool.clone());
    let admin = register(&engine, "root", "admin").await;
    let owner = register(&engine, "olga", "user").await;
    let other = register(&engine, "ivan", "user").await;
    let moderator = register(&engine, "mod", "moderator").await;
    let cat = category(&pool, "books").await;
    let listing = engine
        .create_listing(owner.id, listing_input(cat.id, "Dune", 700))
        .await
        .unwrap();
    let on_listing = (Some(entity_types::LISTING), Some(listing.id));

    let check = |user: i64, perm: &'static str, entity: (Option<&'static str>, Option<i64>)| {
        let engine = engine.clone();
        async move {
            engine
                .check_permission(user, perm, entity.0, entity.1)
                .await
                .unwrap()
        }
    };

    assert!(check(owner.id, "edit_own_listing", on_listing).await);
    assert!(!check(other.id, "edit_own_listing", on_listing).await);
    assert!(check(admin.id, "edit_own_listing", on_listing).await);
    assert!(check(other.id, "create_listing", (None, None)).await);
    assert!(!check(other.id, "moderate_listings", (None, None)).await);
    assert!(check(moderator.id, "moderate_listings", (None, None)).await);
    assert!(!check(moderator.id, "manage_categories", (None, None)).await);
    assert!(check(admin.id, "manage_categories", (None, None)).await);
    assert!(!check(admin.id, "fly_to_the_moon", (None, None)).await);
    assert!(!check(9999, "create_listing", (None, None)).await);

    engine.set_user_active(admin.id, owner.id, false).await.unwrap();
    assert!(!check(owner.id, "create_listing", (None, None)).await);
    assert!(!check(owner.id, "edit_own_listing", on_listing).await);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_cleanup_respects_retention(pool: PgPool) {
    let engine = engine(pool.clone());
    let user = register(&engine, "olga", "user").await;
    let now = Utc::now();
    let retention = engine.config().retention;

    let ancient = now - Duration::days(retention.activity_log_days + 1);
    sqlx::query("INSERT INTO user_activity_log (user_id, action, created_at) VALUES ($1, 'login', $2)")
        .bind(user.id)
        .bind(ancient)
        .execute(&pool)
        .await
        .unwrap();

    let old_notification = now - Duration::days(retention.read_notification_days + 1);
    for is_read in [true, false] {
        sqlx::query(
            "INSERT INTO notifications (user_id, kind, title, content, is_read, created_at)
             VALUES ($1, 'new_review', 't', 'c', $2, $3)",
        )
        .bind(user.id)
        .bind(is_read)
        .bind(old_notification)
        .execute(&pool)
        .await
        .unwrap();
    }

    let idle = now - Duration::days(retention.failed_login_days + 1);
    sqlx::query(
        "INSERT INTO failed_login_attempts (source_address, attempt_count, last_attempt_at, blocked, blocked_until)
         VALUES ('10.0.0.1', 2, $1, FALSE, NULL), ('10.0.0.2', 9, $1, TRUE, $2)",
    )
    .bind(idle)
    .bind(now + Duration::hours(1))
    .execute(&pool)
    .await
    .unwrap();

    let audit_before: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap();

    let report = engine.cleanup_old_logs_at(now).await.unwrap();
    assert_eq!(report.activity_deleted, 1);
    assert_eq!(report.notifications_deleted, 1);
    assert_eq!(report.failed_logins_deleted, 1);

    // Running it again finds nothing more.
    assert_eq!(engine.cleanup_old_logs_at(now).await.unwrap().total(), 0);

    let audit_after: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(audit_before, audit_after);
    // The register entry is recent and survives.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM user_activity_log")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
