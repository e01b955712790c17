//! `transition-events`: flip scheduled events whose kickoff has passed to live.
//!
//! Pure DB job, no scraping involved. Runs every minute.

use chrono::Utc;
use tracing::info;

use super::{JobContext, JobName, JobOutcome, run_with_bookkeeping};

pub async fn run(ctx: &JobContext) -> anyhow::Result<JobOutcome> {
    run_with_bookkeeping(ctx, JobName::TransitionEvents, None, || async {
        let count = ctx.db.scraper_events().transition_scheduled_to_live(Utc::now()).await?;
        if count > 0 {
            info!(count, "transitioned events to live");
        }
        let mut outcome = JobOutcome::success();
        outcome.items_processed = count as i32;
        Ok(outcome)
    })
    .await
}
