//! Reviews and the reputation recompute they trigger.

mod common;

use assert_matches::assert_matches;
use bazaar_core::notification::KIND_NEW_REVIEW;
use bazaar_core::reputation::{LEVEL_EXPERT, LEVEL_MASTER, LEVEL_NEWBIE, LEVEL_TRUSTED};
use bazaar_engine::error::ErrorKind;
use sqlx::PgPool;

use common::{engine, register};

#[sqlx::test(migrations = "../db/migrations")]
async fn test_new_user_is_newbie(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;

    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.total_reviews, 0);
    assert_eq!(rep.level, LEVEL_NEWBIE);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_two_positive_reviews_make_master(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;
    let r1 = register(&engine, "roman", "user").await;
    let r2 = register(&engine, "rita", "user").await;

    engine.create_review(r1.id, user.id, 5, "Great seller").await.unwrap();
    engine.create_review(r2.id, user.id, 4, "Smooth deal").await.unwrap();

    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.total_reviews, 2);
    assert_eq!(rep.positive_reviews, 2);
    assert_eq!(rep.total_score, 9);
    assert_eq!(rep.level, LEVEL_MASTER);

    let notes = engine.list_notifications(user.id, false, None, None).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.kind == KIND_NEW_REVIEW));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_review_rejected(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;
    let reviewer = register(&engine, "roman", "user").await;

    engine.create_review(reviewer.id, user.id, 5, "Great").await.unwrap();
    let again = engine.create_review(reviewer.id, user.id, 1, "Changed my mind").await;
    assert_matches!(again, Err(e) if e.kind() == ErrorKind::Duplicate);

    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.total_reviews, 1);
    assert_eq!(rep.total_score, 5);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_review_of_missing_or_banned_user_not_found(pool: PgPool) {
    let engine = engine(pool);
    let moderator = register(&engine, "mod", "moderator").await;
    let banned = register(&engine, "ulyana", "user").await;
    let reviewer = register(&engine, "roman", "user").await;
    engine
        .set_user_active(moderator.id, banned.id, false)
        .await
        .unwrap();

    let result = engine.create_review(reviewer.id, banned.id, 5, "Great").await;
    assert_matches!(result, Err(e) if e.kind() == ErrorKind::NotFound);
    let missing = engine.create_review(reviewer.id, 9999, 5, "Great").await;
    assert_matches!(missing, Err(e) if e.kind() == ErrorKind::NotFound);

    let rep = engine.reputation(banned.id).await.unwrap();
    assert_eq!(rep.total_reviews, 0);
    assert!(engine.reviews_for_user(banned.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_review_input_rules(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;
    let reviewer = register(&engine, "roman", "user").await;

    let own = engine.create_review(user.id, user.id, 5, "I'm great").await;
    assert_matches!(own, Err(e) if e.kind() == ErrorKind::Validation);

    let rating = engine.create_review(reviewer.id, user.id, 6, "Off the chart").await;
    assert_matches!(rating, Err(e) if e.kind() == ErrorKind::Validation);

    let comment = engine.create_review(reviewer.id, user.id, 3, "  ").await;
    assert_matches!(comment, Err(e) if e.kind() == ErrorKind::Validation);

    let nobody = engine.create_review(reviewer.id, user.id + 999, 3, "Who?").await;
    assert_matches!(nobody, Err(e) if e.kind() == ErrorKind::NotFound);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_and_delete_recompute(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;
    let r1 = register(&engine, "roman", "user").await;
    let r2 = register(&engine, "rita", "user").await;
    let r3 = register(&engine, "ruslan", "user").await;

    engine.create_review(r1.id, user.id, 5, "Great").await.unwrap();
    engine.create_review(r2.id, user.id, 4, "Good").await.unwrap();
    let third = engine.create_review(r3.id, user.id, 5, "Fine").await.unwrap();
    assert_eq!(engine.reputation(user.id).await.unwrap().level, LEVEL_MASTER);

    // 2 of 3 positive: 0.66 puts the user at expert.
    let updated = engine
        .update_review(third.id, r3.id, Some(3), None)
        .await
        .unwrap();
    assert!(!updated.is_positive);
    assert_eq!(updated.comment, "Fine");
    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.level, LEVEL_EXPERT);
    assert_eq!(rep.neutral_reviews, 1);

    // 1 of 2 positive falls below 0.6.
    let reviews = engine.reviews_for_user(user.id).await.unwrap();
    let second = reviews.iter().find(|r| r.reviewer_id == r2.id).unwrap();
    engine.delete_review(second.id, r2.id).await.unwrap();
    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.total_reviews, 2);
    assert_eq!(rep.level, LEVEL_TRUSTED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_review_edit_and_delete_rights(pool: PgPool) {
    let engine = engine(pool);
    let user = register(&engine, "ulyana", "user").await;
    let author = register(&engine, "roman", "user").await;
    let stranger = register(&engine, "ivan", "user").await;
    let moderator = register(&engine, "mod", "moderator").await;

    let review = engine.create_review(author.id, user.id, 1, "Never shipped").await.unwrap();
    assert_eq!(engine.reputation(user.id).await.unwrap().negative_reviews, 1);

    let edit = engine.update_review(review.id, stranger.id, Some(5), None).await;
    assert_matches!(edit, Err(e) if e.kind() == ErrorKind::Permission);

    let delete = engine.delete_review(review.id, stranger.id).await;
    assert_matches!(delete, Err(e) if e.kind() == ErrorKind::Permission);

    engine.delete_review(review.id, moderator.id).await.unwrap();
    let rep = engine.reputation(user.id).await.unwrap();
    assert_eq!(rep.total_reviews, 0);
    assert_eq!(rep.level, LEVEL_NEWBIE);
}
