use std::sync::Arc;

use chrono::{Duration, Utc};
use odds_scraper::db::DbContext;
use odds_scraper::db::models::EventStatus;
use odds_scraper::events::EventBuffer;
use sqlx::PgPool;

fn ctx(pool: PgPool) -> DbContext {
    DbContext::new(pool, Arc::new(EventBuffer::new(64)))
}

async fn seed_fixture(db: &DbContext, kickoff_offset: Duration) -> i64 {
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();
    let event = db
        .scraper_events()
        .upsert_event(sport.id, None, home.id, away.id, Utc::now() + kickoff_offset)
        .await
        .unwrap();
    event.id
}

#[sqlx::test(migrations = "./migrations")]
async fn upsert_event_is_idempotent_on_identity_key(pool: PgPool) {
    let db = ctx(pool);
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();
    let start = Utc::now() + Duration::hours(2);

    let first = db.scraper_events().upsert_event(sport.id, None, home.id, away.id, start).await.unwrap();
    let second = db.scraper_events().upsert_event(sport.id, None, home.id, away.id, start).await.unwrap();

    assert_eq!(first.id, second.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn transition_scheduled_to_live_flips_only_past_kickoffs(pool: PgPool) {
    let db = ctx(pool);
    let past = seed_fixture(&db, Duration::minutes(-5)).await;
    let future = seed_fixture(&db, Duration::hours(3)).await;

    let flipped = db.scraper_events().transition_scheduled_to_live(Utc::now()).await.unwrap();
    assert_eq!(flipped, 1);

    assert_eq!(db.scraper_events().status(past).await.unwrap(), Some(EventStatus::Live));
    assert_eq!(db.scraper_events().status(future).await.unwrap(), Some(EventStatus::Scheduled));
}

#[sqlx::test(migrations = "./migrations")]
async fn mark_finished_records_score_and_transitions_status(pool: PgPool) {
    let db = ctx(pool);
    let event_id = seed_fixture(&db, Duration::minutes(-90)).await;
    db.scraper_events().transition_scheduled_to_live(Utc::now()).await.unwrap();

    db.scraper_events().mark_finished(event_id, 2, 1).await.unwrap();

    assert_eq!(db.scraper_events().status(event_id).await.unwrap(), Some(EventStatus::Finished));
}

#[sqlx::test(migrations = "./migrations")]
async fn candidates_for_odds_excludes_events_outside_window(pool: PgPool) {
    let db = ctx(pool);
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();

    db.scraper_events()
        .upsert_event(sport.id, None, home.id, away.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    db.scraper_events()
        .upsert_event(sport.id, None, away.id, home.id, Utc::now() + Duration::days(10))
        .await
        .unwrap();

    let candidates = db.scraper_events().candidates_for_odds(sport.id, Duration::hours(24)).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].home_team, "Arsenal");
    assert_eq!(candidates[0].sport_slug, "football");
}

#[sqlx::test(migrations = "./migrations")]
async fn candidates_for_live_includes_overdue_scheduled_events(pool: PgPool) {
    let db = ctx(pool);
    let event_id = seed_fixture(&db, Duration::minutes(-10)).await;

    let candidates = db.scraper_events().candidates_for_live().await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, event_id);
}
