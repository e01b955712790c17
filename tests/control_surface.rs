use std::sync::Arc;

use odds_scraper::browser::BrowserPool;
use odds_scraper::control::{self, ControlState};
use odds_scraper::db::DbContext;
use odds_scraper::events::EventBuffer;
use odds_scraper::jobs::JobContext;
use odds_scraper::proxy::ProxyRotator;
use odds_scraper::ratelimit::RateLimitDetector;
use odds_scraper::scheduler::{Scheduler, SchedulerConfig};
use odds_scraper::settlement::NoopSettlementQueue;
use odds_scraper::sources::registry::SourceRegistry;
use sqlx::PgPool;

async fn spawn_control_server(pool: PgPool) -> String {
    let db = DbContext::new(pool, Arc::new(EventBuffer::new(64)));
    let proxy_rotator = Arc::new(ProxyRotator::new(&[]));
    let browser_pool = Arc::new(BrowserPool::new(1, Some(proxy_rotator.clone())));
    let job_ctx = JobContext {
        db,
        sources: Arc::new(SourceRegistry::new(vec![])),
        browser_pool: browser_pool.clone(),
        proxy_rotator: proxy_rotator.clone(),
        rate_limiter: Arc::new(RateLimitDetector::new()),
        settlement: Arc::new(NoopSettlementQueue),
        live_scores: None,
        metrics: odds_scraper::metrics::MetricsRegistry::new(),
    };
    let scheduler = Arc::new(Scheduler::new(job_ctx, SchedulerConfig { enable_cron: false, ..Default::default() }));

    let router = control::create_router(ControlState {
        scheduler,
        browser_pool,
        proxy_rotator,
        started_at: std::time::Instant::now(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[sqlx::test(migrations = "./migrations")]
async fn health_endpoint_reports_healthy(pool: PgPool) {
    let base = spawn_control_server(pool).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["uptime_secs"].is_u64());
    assert_eq!(body["context_stats"].as_array().unwrap().len(), 0);
    assert_eq!(body["proxy_enabled"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn jobs_endpoint_lists_all_jobs_idle(pool: PgPool) {
    let base = spawn_control_server(pool).await;
    let resp = reqwest::get(format!("{base}/jobs")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["jobs"].as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn trigger_unknown_job_returns_not_found(pool: PgPool) {
    let base = spawn_control_server(pool).await;
    let client = reqwest::Client::new();
    let resp = client.post(format!("{base}/jobs/not-a-real-job/trigger")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[sqlx::test(migrations = "./migrations")]
async fn trigger_known_job_accepts_request(pool: PgPool) {
    let base = spawn_control_server(pool).await;
    let client = reqwest::Client::new();
    let resp = client.post(format!("{base}/jobs/transition-events/trigger")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[sqlx::test(migrations = "./migrations")]
async fn contexts_endpoint_starts_empty(pool: PgPool) {
    let base = spawn_control_server(pool).await;
    let resp = reqwest::get(format!("{base}/contexts")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["contexts"].as_array().unwrap().len(), 0);
}
