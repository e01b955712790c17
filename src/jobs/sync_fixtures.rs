//! `sync-fixtures`: walk the next 7 days of fixtures per sport and upsert
//! the taxonomy (sport/competition/team) plus an initial `match_winner`
//! market for each new event. Browser-heavy; scheduled roughly daily.

use std::time::Duration;

use tracing::{info, warn};

use crate::db::models::{AlertSeverity, MarketType};
use crate::error::ScrapeError;

use super::{JobContext, JobName, JobOutcome, SPORTS, run_with_bookkeeping};

const RETRY_BACKOFFS: &[Duration] = &[Duration::from_secs(2), Duration::from_secs(6)];
const CONSECUTIVE_BLOCKED_LIMIT: u32 = 3;

pub async fn run(ctx: &JobContext) -> anyhow::Result<JobOutcome> {
    run_with_bookkeeping(ctx, JobName::SyncFixtures, None, || async {
        let mut outcome = JobOutcome::default();

        for &sport in SPORTS {
            let mut consecutive_blocked = 0u32;
            let mut sport_skipped = false;

            for source in ctx.sources.enabled() {
                if sport_skipped {
                    break;
                }
                ctx.rate_limiter.wait(source.domain()).await;

                let mut page_slot = None;
                let mut attempt = 0;
                let result = loop {
                    let result = source.scrape(&ctx.browser_pool, &mut page_slot, sport).await;
                    match &result {
                        Err(ScrapeError::Transient(_)) if (attempt as usize) < RETRY_BACKOFFS.len() => {
                            tokio::time::sleep(RETRY_BACKOFFS[attempt as usize]).await;
                            attempt += 1;
                            continue;
                        }
                        _ => break result,
                    }
                };

                match result {
                    Ok(rows) => {
                        ctx.rate_limiter.record_success(source.domain());
                        consecutive_blocked = 0;
                        let persisted = persist_fixtures(ctx, &rows).await;
                        outcome.record(sport, persisted as i32, 0);
                    }
                    Err(ScrapeError::NoDataAvailable) => {
                        ctx.metrics.record_no_data(JobName::SyncFixtures.as_str(), source.name());
                    }
                    Err(ScrapeError::BotBlocked { reason }) => {
                        ctx.rate_limiter.record_failure(source.domain());
                        ctx.proxy_rotator.record_failure(source.name());
                        ctx.metrics.record_blocked(JobName::SyncFixtures.as_str(), source.name());
                        warn!(source = source.name(), sport, reason, "source bot-blocked");
                        consecutive_blocked += 1;
                        if consecutive_blocked >= CONSECUTIVE_BLOCKED_LIMIT {
                            ctx.db
                                .alerts()
                                .insert_alert(
                                    AlertSeverity::Critical,
                                    &format!(
                                        "{} sources in a row blocked scraping fixtures for {sport}",
                                        CONSECUTIVE_BLOCKED_LIMIT
                                    ),
                                    None,
                                )
                                .await?;
                            sport_skipped = true;
                        }
                    }
                    Err(other) => {
                        outcome.record(sport, 0, 1);
                        ctx.metrics.record_failure(JobName::SyncFixtures.as_str(), source.name());
                        warn!(source = source.name(), sport, error = %other, "fixture sync failed");
                    }
                }
            }
        }

        info!(processed = outcome.items_processed, failed = outcome.items_failed, "sync-fixtures complete");
        Ok(outcome)
    })
    .await
}

async fn persist_fixtures(ctx: &JobContext, rows: &[crate::sources::NormalizedOdds]) -> usize {
    let mut persisted = 0;
    for row in rows {
        if let Err(err) = persist_one(ctx, row).await {
            warn!(error = %err, "failed to persist fixture");
            continue;
        }
        persisted += 1;
    }
    persisted
}

async fn persist_one(ctx: &JobContext, row: &crate::sources::NormalizedOdds) -> anyhow::Result<()> {
    let sport = ctx.db.teams().upsert_sport(&row.sport, &row.sport).await?;
    let competition_id = match &row.competition {
        Some(name) => Some(ctx.db.teams().upsert_competition(sport.id, name).await?.id),
        None => None,
    };
    let home = ctx.db.teams().upsert_team(sport.id, &row.home_team).await?;
    let away = ctx.db.teams().upsert_team(sport.id, &row.away_team).await?;

    let event = ctx
        .db
        .scraper_events()
        .upsert_event(sport.id, competition_id, home.id, away.id, row.scheduled_start)
        .await?;

    let market = ctx
        .db
        .markets()
        .upsert_market(event.id, MarketType::MatchWinner, None)
        .await?;

    let outcomes: Vec<(String, f64)> = row.outcomes.iter().map(|o| (o.name.clone(), o.odds)).collect();
    ctx.db.markets().upsert_outcomes(market.id, &outcomes).await?;
    Ok(())
}
