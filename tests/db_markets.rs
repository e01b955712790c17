use std::sync::Arc;

use chrono::{Duration, Utc};
use odds_scraper::db::DbContext;
use odds_scraper::db::models::MarketType;
use odds_scraper::events::EventBuffer;
use sqlx::PgPool;

fn ctx(pool: PgPool) -> DbContext {
    DbContext::new(pool, Arc::new(EventBuffer::new(64)))
}

#[sqlx::test(migrations = "./migrations")]
async fn upsert_outcomes_shifts_current_into_previous(pool: PgPool) {
    let db = ctx(pool);
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();
    let event = db
        .scraper_events()
        .upsert_event(sport.id, None, home.id, away.id, Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    let market = db.markets().upsert_market(event.id, MarketType::MatchWinner, None).await.unwrap();

    db.markets()
        .upsert_outcomes(market.id, &[("Arsenal".to_string(), 1.8), ("Chelsea".to_string(), 2.1)])
        .await
        .unwrap();
    db.markets()
        .upsert_outcomes(market.id, &[("Arsenal".to_string(), 1.9), ("Chelsea".to_string(), 2.0)])
        .await
        .unwrap();

    let row: (f64, Option<f64>) =
        sqlx::query_as("SELECT current_odds, previous_odds FROM outcomes WHERE market_id = $1 AND name = 'Arsenal'")
            .bind(market.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(row, (1.9, Some(1.8)));
}

#[sqlx::test(migrations = "./migrations")]
async fn upsert_market_is_idempotent_on_type_and_line(pool: PgPool) {
    let db = ctx(pool);
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();
    let event = db
        .scraper_events()
        .upsert_event(sport.id, None, home.id, away.id, Utc::now() + Duration::hours(2))
        .await
        .unwrap();

    let first = db.markets().upsert_market(event.id, MarketType::OverUnderGoals, Some(2.5)).await.unwrap();
    let second = db.markets().upsert_market(event.id, MarketType::OverUnderGoals, Some(2.5)).await.unwrap();

    assert_eq!(first.id, second.id);
}
