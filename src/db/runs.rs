//! `ScraperRun` bookkeeping with automatic event emission.

use std::collections::HashMap;

use crate::db::DbContext;
use crate::db::models::RunStatus;
use crate::error::Result;
use crate::events::{DomainEvent, ScraperRunEvent};

pub struct RunOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> RunOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Start a new run row; emits `ScraperRunEvent::Started`.
    pub async fn insert_run(&self, job_type: &str, source: Option<&str>) -> Result<i64> {
        let run_id: i64 = sqlx::query_scalar(
            "INSERT INTO scraper_runs (job_type, source, status, started_at) \
             VALUES ($1, $2, 'running', NOW()) RETURNING id",
        )
        .bind(job_type)
        .bind(source)
        .fetch_one(self.ctx.pool())
        .await?;

        self.ctx.events().publish(DomainEvent::ScraperRun(ScraperRunEvent::Started {
            run_id,
            job_type: job_type.to_string(),
        }));
        Ok(run_id)
    }

    /// Finalize a run; emits `ScraperRunEvent::Completed`.
    pub async fn update_run(
        &self,
        run_id: i64,
        status: RunStatus,
        items_processed: i32,
        items_failed: i32,
        error_message: Option<&str>,
        per_sport: Option<&HashMap<String, i32>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scraper_runs
            SET status = $2,
                finished_at = NOW(),
                duration_ms = EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000,
                items_processed = $3,
                items_failed = $4,
                error_message = $5,
                per_sport_breakdown = $6
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(status)
        .bind(items_processed)
        .bind(items_failed)
        .bind(error_message)
        .bind(per_sport.map(|m| serde_json::to_value(m).unwrap_or_default()))
        .execute(self.ctx.pool())
        .await?;

        self.ctx.events().publish(DomainEvent::ScraperRun(ScraperRunEvent::Completed {
            run_id,
            status,
            items_processed,
            items_failed,
        }));
        Ok(())
    }
}
