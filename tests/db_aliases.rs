use std::sync::Arc;

use odds_scraper::db::DbContext;
use odds_scraper::events::EventBuffer;
use odds_scraper::resolver::normalize;
use sqlx::PgPool;

fn ctx(pool: PgPool) -> DbContext {
    DbContext::new(pool, Arc::new(EventBuffer::new(64)))
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_alias_is_idempotent_and_lookup_returns_canonical_name(pool: PgPool) {
    let db = ctx(pool);
    let sport = db.teams().upsert_sport("football", "Football").await.unwrap();
    let team = db.teams().upsert_team(sport.id, "Manchester United").await.unwrap();

    let alias = normalize("Man Utd");
    db.aliases().insert_alias(team.id, &alias, "football-exchange").await.unwrap();
    db.aliases().insert_alias(team.id, &alias, "football-exchange").await.unwrap();

    let resolved = db.aliases().lookup(sport.id, &alias).await.unwrap();
    assert_eq!(resolved, Some("Manchester United".to_string()));
}

#[sqlx::test(migrations = "./migrations")]
async fn all_for_sport_is_scoped_to_that_sport(pool: PgPool) {
    let db = ctx(pool);
    let football = db.teams().upsert_sport("football", "Football").await.unwrap();
    let tennis = db.teams().upsert_sport("tennis", "Tennis").await.unwrap();
    let arsenal = db.teams().upsert_team(football.id, "Arsenal").await.unwrap();
    let djokovic = db.teams().upsert_team(tennis.id, "Novak Djokovic").await.unwrap();

    db.aliases().insert_alias(arsenal.id, "the gunners", "football-exchange").await.unwrap();
    db.aliases().insert_alias(djokovic.id, "n djokovic", "football-exchange").await.unwrap();

    let football_aliases = db.aliases().all_for_sport(football.id).await.unwrap();
    assert_eq!(football_aliases.get("the gunners"), Some(&"Arsenal".to_string()));
    assert!(!football_aliases.contains_key("n djokovic"));
}
