use std::sync::Arc;

use chrono::{Duration, Utc};
use odds_scraper::browser::BrowserPool;
use odds_scraper::db::DbContext;
use odds_scraper::events::EventBuffer;
use odds_scraper::jobs::{self, JobContext};
use odds_scraper::proxy::ProxyRotator;
use odds_scraper::ratelimit::RateLimitDetector;
use odds_scraper::settlement::NoopSettlementQueue;
use odds_scraper::sources::registry::SourceRegistry;
use sqlx::PgPool;

fn job_context(pool: PgPool) -> JobContext {
    let db = DbContext::new(pool, Arc::new(EventBuffer::new(64)));
    let proxy_rotator = Arc::new(ProxyRotator::new(&[]));
    JobContext {
        db,
        sources: Arc::new(SourceRegistry::new(vec![])),
        browser_pool: Arc::new(BrowserPool::new(1, Some(proxy_rotator.clone()))),
        proxy_rotator,
        rate_limiter: Arc::new(RateLimitDetector::new()),
        settlement: Arc::new(NoopSettlementQueue),
        live_scores: None,
        metrics: odds_scraper::metrics::MetricsRegistry::new(),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn transition_events_flips_overdue_fixtures_and_records_run(pool: PgPool) {
    let ctx = job_context(pool);
    let sport = ctx.db.teams().upsert_sport("football", "Football").await.unwrap();
    let home = ctx.db.teams().upsert_team(sport.id, "Arsenal").await.unwrap();
    let away = ctx.db.teams().upsert_team(sport.id, "Chelsea").await.unwrap();
    let event = ctx
        .db
        .scraper_events()
        .upsert_event(sport.id, None, home.id, away.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    let outcome = jobs::transition_events::run(&ctx).await.unwrap();
    assert_eq!(outcome.items_processed, 1);

    let status = ctx.db.scraper_events().status(event.id).await.unwrap();
    assert_eq!(status, Some(odds_scraper::db::models::EventStatus::Live));
}

#[sqlx::test(migrations = "./migrations")]
async fn transition_events_is_a_noop_with_nothing_due(pool: PgPool) {
    let ctx = job_context(pool);
    let outcome = jobs::transition_events::run(&ctx).await.unwrap();
    assert_eq!(outcome.items_processed, 0);
}
