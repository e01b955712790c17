//! `sync-live-scores`: update scores/minute/period for events that are
//! live or whose kickoff has already passed, and hand finished events to
//! the settlement queue. Cheap when nothing is live — exits immediately.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::resolver::{self, PreloadedAliases, ResolvedMatch};
use crate::settlement::SettlementMessage;

use super::{JobContext, JobName, JobOutcome, run_with_bookkeeping};

pub async fn run(ctx: &JobContext) -> anyhow::Result<JobOutcome> {
    run_with_bookkeeping(ctx, JobName::SyncLiveScores, None, || async {
        let mut outcome = JobOutcome::default();

        let candidates = ctx.db.scraper_events().candidates_for_live().await?;
        if candidates.is_empty() {
            return Ok(JobOutcome::success());
        }

        let Some(source) = ctx.live_scores.as_ref().filter(|s| s.enabled()) else {
            info!("no live-scores source configured, skipping tick");
            return Ok(JobOutcome::success());
        };

        let mut by_sport: HashMap<&str, Vec<&crate::db::models::EventCandidate>> = HashMap::new();
        for candidate in &candidates {
            by_sport.entry(candidate.sport_slug.as_str()).or_default().push(candidate);
        }

        for (sport, sport_candidates) in by_sport {
            let resolver_candidates: Vec<resolver::Candidate> = sport_candidates
                .iter()
                .map(|c| resolver::Candidate {
                    event_id: c.id,
                    home_team: c.home_team.clone(),
                    away_team: c.away_team.clone(),
                    scheduled_start: c.scheduled_start,
                })
                .collect();
            let aliases = PreloadedAliases(HashMap::new());

            let updates = match source.fetch_live(sport).await {
                Ok(updates) => updates,
                Err(ScrapeError::NoDataAvailable) => {
                    ctx.metrics.record_no_data(JobName::SyncLiveScores.as_str(), source.name());
                    continue;
                }
                Err(ScrapeError::BotBlocked { reason }) => {
                    ctx.metrics.record_blocked(JobName::SyncLiveScores.as_str(), source.name());
                    warn!(sport, reason, "live-scores source bot-blocked");
                    continue;
                }
                Err(other) => {
                    outcome.record(sport, 0, 1);
                    ctx.metrics.record_failure(JobName::SyncLiveScores.as_str(), source.name());
                    warn!(sport, error = %other, "live-scores fetch failed");
                    continue;
                }
            };

            for update in &updates {
                match resolver::resolve(
                    &update.home_team,
                    &update.away_team,
                    Utc::now(),
                    &aliases,
                    &resolver_candidates,
                ) {
                    ResolvedMatch::Matched { event_id, .. } => {
                        if let Err(err) = apply_live_update(ctx, event_id, update).await {
                            warn!(error = %err, event_id, "failed to persist live update");
                            outcome.record(sport, 0, 1);
                            continue;
                        }
                        outcome.record(sport, 1, 0);
                    }
                    ResolvedMatch::NoMatch => {
                        warn!(
                            sport,
                            raw_home = %update.home_team,
                            raw_away = %update.away_team,
                            "resolver miss on live update"
                        );
                        outcome.record(sport, 0, 1);
                    }
                }
            }
        }

        info!(processed = outcome.items_processed, failed = outcome.items_failed, "sync-live-scores complete");
        Ok(outcome)
    })
    .await
}

async fn apply_live_update(
    ctx: &JobContext,
    event_id: i64,
    update: &crate::sources::LiveScoreUpdate,
) -> anyhow::Result<()> {
    if update.finished {
        ctx.db
            .scraper_events()
            .mark_finished(event_id, update.home_score, update.away_score)
            .await?;
        if let Err(err) = ctx
            .settlement
            .enqueue(SettlementMessage {
                event_id,
                home_score: update.home_score,
                away_score: update.away_score,
            })
            .await
        {
            warn!(error = %err, event_id, "settlement enqueue failed, event already marked finished");
        }
    } else {
        ctx.db
            .scraper_events()
            .update_live_state(
                event_id,
                update.home_score,
                update.away_score,
                update.minute,
                update.period.as_deref(),
            )
            .await?;
    }
    Ok(())
}
