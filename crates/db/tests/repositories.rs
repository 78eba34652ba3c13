//! Integration tests for the repository layer.
//!
//! Exercises the repositories against a real database:
//! - Unique constraints on users and reviews
//! - Listing status guards (pending-only transitions, active-only sale)
//! - Statistics recomputation from listing rows
//! - Search filters and ordering
//! - Login attempt locking and cleanup
//! - Report constraints and queue order

use bazaar_core::listing::{STATUS_ACTIVE, STATUS_EXPIRED, STATUS_PENDING, STATUS_REJECTED};
use bazaar_core::login_guard::{is_blocked, LockoutPolicy};
use bazaar_core::report::{STATUS_PENDING as REPORT_PENDING, STATUS_RESOLVED as REPORT_RESOLVED};
use bazaar_core::search::SortBy;
use bazaar_db::models::category::CreateCategory;
use bazaar_db::models::listing::{CreateListing, ListingSearch, UpdateListing};
use bazaar_db::models::report::{CreateReport, ReportDecision};
use bazaar_db::models::review::CreateReview;
use bazaar_db::models::user::CreateUser;
use bazaar_db::repositories::{
    CategoryRepo, ListingRepo, LoginAttemptRepo, ReportRepo, ReviewRepo, StatisticsRepo,
    UserRepo,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_user(name: &str) -> CreateUser {
    CreateUser {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        role: "user".to_string(),
        phone: None,
    }
}

fn new_category(slug: &str) -> CreateCategory {
    CreateCategory {
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        description: None,
        parent_id: None,
        sort_order: 0,
    }
}

fn new_listing(owner_id: i64, category_id: i64, title: &str, price: i64) -> CreateListing {
    CreateListing {
        owner_id,
        category_id,
        title: title.to_string(),
        description: format!("{title} in good shape"),
        price,
        currency: "RUB".to_string(),
        condition: "used".to_string(),
        location: "Moscow".to_string(),
        latitude: None,
        longitude: None,
        is_negotiable: true,
        is_urgent: false,
        expires_at: None,
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Users and reviews
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_username_rejected(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    UserRepo::create(&mut conn, &new_user("alice")).await.unwrap();

    let mut dup = new_user("alice");
    dup.email = "other@example.com".to_string();
    let err = UserRepo::create(&mut conn, &dup).await.unwrap_err();
    assert!(is_unique_violation(&err, "uq_users_username"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_review_for_pair_rejected(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = UserRepo::create(&mut conn, &new_user("a")).await.unwrap();
    let b = UserRepo::create(&mut conn, &new_user("b")).await.unwrap();

    let review = CreateReview {
        reviewer_id: a.id,
        reviewed_user_id: b.id,
        rating: 5,
        comment: "Great seller".to_string(),
        is_positive: true,
    };
    ReviewRepo::create(&mut conn, &review).await.unwrap();
    let err = ReviewRepo::create(&mut conn, &review).await.unwrap_err();
    assert!(is_unique_violation(&err, "uq_reviews_reviewer_reviewed"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_self_review_blocked_by_check(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = UserRepo::create(&mut conn, &new_user("a")).await.unwrap();
    let review = CreateReview {
        reviewer_id: a.id,
        reviewed_user_id: a.id,
        rating: 5,
        comment: "Me".to_string(),
        is_positive: true,
    };
    assert!(ReviewRepo::create(&mut conn, &review).await.is_err());
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_pending_transition_applies_once(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("bikes")).await.unwrap();
    let listing = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Road bike", 100))
        .await
        .unwrap();
    assert_eq!(listing.status, STATUS_PENDING);

    let now = Utc::now();
    let approved = ListingRepo::transition_from_pending(&mut conn, listing.id, STATUS_ACTIVE, now)
        .await
        .unwrap()
        .expect("first transition applies");
    assert_eq!(approved.status, STATUS_ACTIVE);
    assert!(approved.published_at.is_some());

    let again = ListingRepo::transition_from_pending(&mut conn, listing.id, STATUS_REJECTED, now)
        .await
        .unwrap();
    assert!(again.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_resets_status_to_pending(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("bikes")).await.unwrap();
    let listing = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Road bike", 100))
        .await
        .unwrap();
    ListingRepo::transition_from_pending(&mut conn, listing.id, STATUS_ACTIVE, Utc::now())
        .await
        .unwrap();

    let patch = UpdateListing {
        price: Some(90),
        ..Default::default()
    };
    let updated = ListingRepo::update(&mut conn, listing.id, &patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, STATUS_PENDING);
    assert_eq!(updated.price, 90);
    assert_eq!(updated.title, "Road bike");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_zero_price_violates_check(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("misc")).await.unwrap();
    let result = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Freebie", 0)).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expire_due_is_idempotent(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("misc")).await.unwrap();
    let listing = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Old lamp", 10))
        .await
        .unwrap();
    let published = Utc::now() - Duration::days(40);
    ListingRepo::transition_from_pending(&mut conn, listing.id, STATUS_ACTIVE, published)
        .await
        .unwrap();

    let now = Utc::now();
    let cutoff = now - Duration::days(30);
    let expired = ListingRepo::expire_due(&mut conn, now, cutoff, 100).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].status, STATUS_EXPIRED);

    let second = ListingRepo::expire_due(&mut conn, now, cutoff, 100).await.unwrap();
    assert!(second.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_statistics_recompute_counts_pending_and_active(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("misc")).await.unwrap();

    let a = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "A", 100))
        .await
        .unwrap();
    ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "B", 200))
        .await
        .unwrap();
    let c = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "C", 300))
        .await
        .unwrap();

    let now = Utc::now();
    ListingRepo::transition_from_pending(&mut conn, a.id, STATUS_ACTIVE, now)
        .await
        .unwrap();
    ListingRepo::mark_sold(&mut conn, a.id, now).await.unwrap().unwrap();
    ListingRepo::transition_from_pending(&mut conn, c.id, STATUS_REJECTED, now)
        .await
        .unwrap();

    let stats = StatisticsRepo::recompute(&mut conn, owner.id).await.unwrap();
    assert_eq!(stats.listings_count, 1);
    assert_eq!(stats.sold_count, 1);
    assert_eq!(stats.total_earnings, 100);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_statistics_recompute_with_no_listings(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let stats = StatisticsRepo::recompute(&mut conn, owner.id).await.unwrap();
    assert_eq!(stats.listings_count, 0);
    assert_eq!(stats.total_earnings, 0);
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_search_filters_and_sorts_active_listings(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("bikes")).await.unwrap();
    let now = Utc::now();

    for (title, price) in [("Red bike", 300), ("Blue bike", 100), ("Bike pump", 20)] {
        let l = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, title, price))
            .await
            .unwrap();
        ListingRepo::transition_from_pending(&mut conn, l.id, STATUS_ACTIVE, now)
            .await
            .unwrap();
    }
    // Still pending: never visible in search.
    ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Green bike", 50))
        .await
        .unwrap();

    let page = ListingRepo::search(
        &pool,
        &ListingSearch {
            query: Some("bike".to_string()),
            min_price: Some(50),
            sort_by: SortBy::PriceLow,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let titles: Vec<&str> = page.items.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Blue bike", "Red bike"]);
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].owner_username, "owner");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_search_treats_wildcards_literally(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let owner = UserRepo::create(&mut conn, &new_user("owner")).await.unwrap();
    let cat = CategoryRepo::create(&mut conn, &new_category("misc")).await.unwrap();
    let l = ListingRepo::create(&mut conn, &new_listing(owner.id, cat.id, "Sofa", 500))
        .await
        .unwrap();
    ListingRepo::transition_from_pending(&mut conn, l.id, STATUS_ACTIVE, Utc::now())
        .await
        .unwrap();

    let page = ListingRepo::search(
        &pool,
        &ListingSearch {
            query: Some("%".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(page.items.is_empty());
}

// ---------------------------------------------------------------------------
// Login attempts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_login_attempt_lock_save_and_clear(pool: PgPool) {
    let policy = LockoutPolicy::default();
    let now = Utc::now();
    let mut conn = pool.acquire().await.unwrap();

    let mut last = None;
    for _ in 0..policy.threshold {
        let record = LoginAttemptRepo::lock_or_create(&mut conn, "10.0.0.1", now)
            .await
            .unwrap();
        let next = policy.next_after_failure(Some(&record.state()), now);
        last = Some(
            LoginAttemptRepo::save(&mut conn, "10.0.0.1", Some("alice"), &next)
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.attempt_count, policy.threshold);
    assert!(is_blocked(&last.state(), now));
    assert_eq!(last.username.as_deref(), Some("alice"));

    assert!(LoginAttemptRepo::clear(&mut conn, "10.0.0.1").await.unwrap());
    assert!(LoginAttemptRepo::find(&pool, "10.0.0.1").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_login_attempts_keep_active_blocks(pool: PgPool) {
    let policy = LockoutPolicy::default();
    let mut conn = pool.acquire().await.unwrap();
    let long_ago = Utc::now() - Duration::days(60);

    let record = LoginAttemptRepo::lock_or_create(&mut conn, "idle", long_ago)
        .await
        .unwrap();
    let state = policy.next_after_failure(Some(&record.state()), long_ago);
    LoginAttemptRepo::save(&mut conn, "idle", None, &state).await.unwrap();

    let now = Utc::now();
    let removed = LoginAttemptRepo::delete_stale(&mut conn, now - Duration::days(30), now)
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn new_report(reporter_id: i64, reported_user_id: i64, report_type: &str) -> CreateReport {
    CreateReport {
        reporter_id,
        reported_user_id: Some(reported_user_id),
        reported_listing_id: None,
        report_type: report_type.to_string(),
        description: "Sends links to a phishing site".to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_report_type_checked_and_queue_oldest_first(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let alice = UserRepo::create(&mut conn, &new_user("alice")).await.unwrap();
    let bob = UserRepo::create(&mut conn, &new_user("bob")).await.unwrap();
    let moderator = UserRepo::create(&mut conn, &new_user("mod")).await.unwrap();

    let err = ReportRepo::create(&mut conn, &new_report(alice.id, bob.id, "rude"))
        .await
        .unwrap_err();
    // 23514: check_violation
    assert!(matches!(
        err,
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23514")
    ));

    let first = ReportRepo::create(&mut conn, &new_report(alice.id, bob.id, "spam"))
        .await
        .unwrap();
    let second = ReportRepo::create(&mut conn, &new_report(bob.id, alice.id, "fraud"))
        .await
        .unwrap();
    assert_eq!(first.status, REPORT_PENDING);

    let queue = ReportRepo::list_pending(&pool, 10, 0).await.unwrap();
    let ids: Vec<i64> = queue.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let closed = ReportRepo::apply_decision(
        &mut conn,
        first.id,
        &ReportDecision {
            status: REPORT_RESOLVED.to_string(),
            moderator_id: moderator.id,
            resolution: None,
            resolved_at: Some(Utc::now()),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(closed.resolution, "");
    assert_eq!(closed.moderator_id, Some(moderator.id));

    let queue = ReportRepo::list_pending(&pool, 10, 0).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, second.id);
}
