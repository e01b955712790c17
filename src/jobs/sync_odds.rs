//! `sync-odds`: update Markets/Outcomes for events kicking off in the next
//! 24h, by walking sources in priority order per sport.
//!
//! Stops pulling further sources for a sport once 20 matched events have
//! been updated or the registry is exhausted, per spec.md §4.G.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{info, warn};

use crate::db::models::{AlertSeverity, MarketType, RunStatus};
use crate::error::ScrapeError;
use crate::resolver::{self, PreloadedAliases, ResolvedMatch};

use super::{JobContext, JobName, JobOutcome, SPORTS, run_with_bookkeeping};

const MATCHED_TARGET: usize = 20;
const ODDS_WINDOW: ChronoDuration = ChronoDuration::hours(24);
const RETRY_BACKOFFS: &[Duration] = &[Duration::from_secs(2), Duration::from_secs(6)];
const CONSECUTIVE_BLOCKED_LIMIT: u32 = 3;
const MIN_ODDS: f64 = 1.01;
const MAX_ODDS: f64 = 1000.0;

pub async fn run(ctx: &JobContext) -> anyhow::Result<JobOutcome> {
    run_with_bookkeeping(ctx, JobName::SyncOdds, None, || async {
        let mut outcome = JobOutcome::default();

        for &sport in SPORTS {
            let sport_row = ctx.db.teams().upsert_sport(sport, sport).await?;
            let candidates = ctx
                .db
                .scraper_events()
                .candidates_for_odds(sport_row.id, ODDS_WINDOW)
                .await?;
            if candidates.is_empty() {
                continue;
            }

            let resolver_candidates: Vec<resolver::Candidate> = candidates
                .iter()
                .map(|c| resolver::Candidate {
                    event_id: c.id,
                    home_team: c.home_team.clone(),
                    away_team: c.away_team.clone(),
                    scheduled_start: c.scheduled_start,
                })
                .collect();
            let aliases = PreloadedAliases(ctx.db.aliases().all_for_sport(sport_row.id).await?);

            let mut matched_events: HashSet<i64> = HashSet::new();
            let mut consecutive_blocked = 0u32;

            for source in ctx.sources.enabled() {
                if matched_events.len() >= MATCHED_TARGET {
                    break;
                }
                if ctx.rate_limiter.is_cooling_down(source.domain()) {
                    continue;
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
                        ctx.proxy_rotator.record_success(source.name());
                        ctx.metrics.record_success(JobName::SyncOdds.as_str(), source.name(), 0);
                        consecutive_blocked = 0;

                        for row in &rows {
                            match resolver::resolve(
                                &row.home_team,
                                &row.away_team,
                                row.scheduled_start,
                                &aliases,
                                &resolver_candidates,
                            ) {
                                ResolvedMatch::Matched {
                                    event_id,
                                    home_is_new_alias,
                                    away_is_new_alias,
                                } => {
                                    if let Err(err) = apply_odds_update(
                                        ctx,
                                        event_id,
                                        row,
                                        home_is_new_alias,
                                        away_is_new_alias,
                                        source.name(),
                                        &row.home_team,
                                        &row.away_team,
                                    )
                                    .await
                                    {
                                        warn!(error = %err, event_id, "failed to persist odds update");
                                        outcome.record(sport, 0, 1);
                                        continue;
                                    }
                                    matched_events.insert(event_id);
                                    outcome.record(sport, 1, 0);
                                }
                                ResolvedMatch::NoMatch => {
                                    warn!(
                                        sport,
                                        source = source.name(),
                                        raw_home = %row.home_team,
                                        raw_away = %row.away_team,
                                        "resolver miss: no candidate event matched"
                                    );
                                    outcome.record(sport, 0, 1);
                                }
                            }
                        }
                    }
                    Err(ScrapeError::NoDataAvailable) => {
                        ctx.metrics.record_no_data(JobName::SyncOdds.as_str(), source.name());
                    }
                    Err(ScrapeError::BotBlocked { reason }) => {
                        ctx.rate_limiter.record_failure(source.domain());
                        ctx.proxy_rotator.record_failure(source.name());
                        ctx.metrics.record_blocked(JobName::SyncOdds.as_str(), source.name());
                        warn!(source = source.name(), sport, reason, "source bot-blocked");
                        outcome.record(sport, 0, 1);
                        outcome.status.get_or_insert(RunStatus::Partial);
                        consecutive_blocked += 1;
                        if consecutive_blocked >= CONSECUTIVE_BLOCKED_LIMIT {
                            ctx.db
                                .alerts()
                                .insert_alert(
                                    AlertSeverity::Critical,
                                    &format!(
                                        "{CONSECUTIVE_BLOCKED_LIMIT} sources in a row blocked scraping odds for {sport}"
                                    ),
                                    None,
                                )
                                .await?;
                            break;
                        }
                    }
                    Err(other) => {
                        outcome.record(sport, 0, 1);
                        ctx.metrics.record_failure(JobName::SyncOdds.as_str(), source.name());
                        warn!(source = source.name(), sport, error = %other, "odds sync failed");
                    }
                }
            }
        }

        info!(processed = outcome.items_processed, failed = outcome.items_failed, "sync-odds complete");
        Ok(outcome)
    })
    .await
}

async fn apply_odds_update(
    ctx: &JobContext,
    event_id: i64,
    row: &crate::sources::NormalizedOdds,
    home_is_new_alias: bool,
    away_is_new_alias: bool,
    source_name: &str,
    raw_home: &str,
    raw_away: &str,
) -> anyhow::Result<()> {
    let market = ctx
        .db
        .markets()
        .upsert_market(event_id, MarketType::MatchWinner, row.line)
        .await?;

    let outcomes: Vec<(String, f64)> = row
        .outcomes
        .iter()
        .filter(|o| {
            let in_range = (MIN_ODDS..=MAX_ODDS).contains(&o.odds);
            if !in_range {
                warn!(odds = o.odds, name = %o.name, "dropping outcome with out-of-domain odds");
            }
            in_range
        })
        .map(|o| (o.name.clone(), o.odds))
        .collect();
    if outcomes.is_empty() {
        return Ok(());
    }
    ctx.db.markets().upsert_outcomes(market.id, &outcomes).await?;

    if home_is_new_alias || away_is_new_alias {
        let (home_team_id, away_team_id) = ctx.db.scraper_events().team_ids(event_id).await?;
        if home_is_new_alias {
            write_back_alias(ctx, home_team_id, raw_home, source_name).await?;
        }
        if away_is_new_alias {
            write_back_alias(ctx, away_team_id, raw_away, source_name).await?;
        }
    }
    Ok(())
}

async fn write_back_alias(
    ctx: &JobContext,
    team_id: i64,
    raw_name: &str,
    source_name: &str,
) -> anyhow::Result<()> {
    let normalized = resolver::normalize(raw_name);
    ctx.db.aliases().insert_alias(team_id, &normalized, source_name).await?;
    Ok(())
}
