//! Job bodies (component G).
//!
//! Each job is a plain async function over a shared `JobContext`; the
//! scheduler is responsible for deciding *when* to call them. Dispatch is a
//! compile-time-exhaustive match over `JobName` rather than a dynamic map,
//! so adding a job is a type error everywhere it isn't handled yet.

pub mod sync_fixtures;
pub mod sync_live_scores;
pub mod sync_odds;
pub mod transition_events;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::browser::BrowserPool;
use crate::db::DbContext;
use crate::db::models::RunStatus;
use crate::proxy::SharedProxyRotator;
use crate::ratelimit::RateLimitDetector;
use crate::settlement::SharedSettlementQueue;
use crate::sources::LiveScoreSource;
use crate::sources::registry::SourceRegistry;

/// Sports this service enumerates sources for.
pub const SPORTS: &[&str] = &["football", "tennis", "basketball"];

/// Every job the scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobName {
    SyncFixtures,
    SyncOdds,
    SyncLiveScores,
    TransitionEvents,
    BrowserRotation,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::SyncFixtures => "sync-fixtures",
            JobName::SyncOdds => "sync-odds",
            JobName::SyncLiveScores => "sync-live-scores",
            JobName::TransitionEvents => "transition-events",
            JobName::BrowserRotation => "browser-rotation",
        }
    }

    pub fn all() -> &'static [JobName] {
        &[
            JobName::SyncFixtures,
            JobName::SyncOdds,
            JobName::SyncLiveScores,
            JobName::TransitionEvents,
            JobName::BrowserRotation,
        ]
    }
}

/// Shared handles every job body needs. Cheap to clone (all `Arc`s).
#[derive(Clone)]
pub struct JobContext {
    pub db: DbContext,
    pub sources: Arc<SourceRegistry>,
    pub browser_pool: Arc<BrowserPool>,
    pub proxy_rotator: SharedProxyRotator,
    pub rate_limiter: Arc<RateLimitDetector>,
    pub settlement: SharedSettlementQueue,
    pub live_scores: Option<Arc<dyn LiveScoreSource>>,
    pub metrics: crate::metrics::MetricsRegistry,
}

/// Outcome of one job invocation, persisted onto its `ScraperRun` row.
#[derive(Debug, Default, Clone)]
pub struct JobOutcome {
    pub items_processed: i32,
    pub items_failed: i32,
    pub per_sport: HashMap<String, i32>,
    pub status: Option<RunStatus>,
}

impl JobOutcome {
    pub fn success() -> Self {
        Self {
            status: Some(RunStatus::Success),
            ..Default::default()
        }
    }

    pub fn record(&mut self, sport: &str, processed: i32, failed: i32) {
        self.items_processed += processed;
        self.items_failed += failed;
        *self.per_sport.entry(sport.to_string()).or_insert(0) += processed;
    }

    pub fn finalize_status(&self) -> RunStatus {
        self.status.unwrap_or(if self.items_failed == 0 {
            RunStatus::Success
        } else if self.items_processed == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        })
    }
}

/// Run one job body behind the common run-row bookkeeping: insert a
/// `running` row, invoke `body`, then finalize it with the outcome or error.
pub async fn run_with_bookkeeping<F, Fut>(
    ctx: &JobContext,
    job_name: JobName,
    source: Option<&str>,
    body: F,
) -> anyhow::Result<JobOutcome>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<JobOutcome>>,
{
    let run_id = ctx.db.runs().insert_run(job_name.as_str(), source).await?;
    ctx.metrics.record_request(job_name.as_str(), source.unwrap_or(""));

    match body().await {
        Ok(outcome) => {
            let status = outcome.finalize_status();
            ctx.db
                .runs()
                .update_run(
                    run_id,
                    status,
                    outcome.items_processed,
                    outcome.items_failed,
                    None,
                    Some(&outcome.per_sport),
                )
                .await?;
            ctx.metrics.record_success(job_name.as_str(), source.unwrap_or(""), 0);
            Ok(outcome)
        }
        Err(err) => {
            ctx.db
                .runs()
                .update_run(run_id, RunStatus::Failed, 0, 0, Some(&err.to_string()), None)
                .await?;
            ctx.metrics.record_failure(job_name.as_str(), source.unwrap_or(""));
            Err(err)
        }
    }
}
