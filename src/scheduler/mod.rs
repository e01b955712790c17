//! Job scheduler (component H).
//!
//! Owns the cron-like cadence for every job in `crate::jobs` plus the
//! adaptive `sync-odds` loop from [`adaptive`]. Each job tick is
//! self-exclusive: if a job is still running when its next tick arrives,
//! the tick is skipped and logged rather than queued.

pub mod adaptive;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::db::models::RunStatus;
use crate::jobs::{JobContext, JobName, sync_fixtures, sync_live_scores, sync_odds, transition_events};

use adaptive::Urgency;

/// How far ahead `sync-odds` looks when estimating time-to-kickoff urgency.
const URGENCY_WINDOW: ChronoDuration = ChronoDuration::hours(24);
/// Fixed interval for `transition-events`.
const TRANSITION_EVENTS_INTERVAL: StdDuration = StdDuration::from_secs(60);
/// Fixed interval for the browser pool's forced rotation tick.
const BROWSER_ROTATION_INTERVAL: StdDuration = StdDuration::from_secs(6 * 60 * 60);
/// Default hour (Europe/London local time) `sync-fixtures` runs at.
const DEFAULT_FIXTURES_HOUR: u32 = 3;

/// Runtime-tunable scheduling knobs, sourced from `Config`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enable_cron: bool,
    pub live_scores_interval: StdDuration,
    pub off_peak_tz: Tz,
    pub fixtures_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enable_cron: true,
            live_scores_interval: StdDuration::from_secs(90),
            off_peak_tz: chrono_tz::Europe::London,
            fixtures_hour: DEFAULT_FIXTURES_HOUR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("job {0:?} is already running")]
    AlreadyRunning(JobName),
}

/// Point-in-time view of one job, exposed over the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: JobName,
    pub running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<i64>,
    pub last_status: Option<RunStatus>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub fail_count: u64,
    pub next_scheduled_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    fn idle(name: JobName) -> Self {
        Self {
            name,
            running: false,
            last_run_at: None,
            last_duration_ms: None,
            last_status: None,
            last_error: None,
            run_count: 0,
            fail_count: 0,
            next_scheduled_at: None,
        }
    }
}

/// Owns job state and dispatch; cheap to share behind an `Arc` between the
/// background cron loop and the HTTP control surface.
pub struct Scheduler {
    ctx: JobContext,
    config: SchedulerConfig,
    states: DashMap<JobName, JobStatus>,
}

pub type SharedScheduler = Arc<Scheduler>;

impl Scheduler {
    pub fn new(ctx: JobContext, config: SchedulerConfig) -> Self {
        let states = DashMap::new();
        for &name in JobName::all() {
            states.insert(name, JobStatus::idle(name));
        }
        Self { ctx, config, states }
    }

    pub fn status(&self, name: JobName) -> Option<JobStatus> {
        self.states.get(&name).map(|s| s.clone())
    }

    pub fn status_all(&self) -> Vec<JobStatus> {
        JobName::all().iter().filter_map(|&name| self.status(name)).collect()
    }

    fn is_running(&self, name: JobName) -> bool {
        self.states.get(&name).is_some_and(|s| s.running)
    }

    /// Records the next cron-scheduled occurrence for `name`, surfaced via
    /// the control API. Left `None` when `enable_cron` is off.
    fn set_next_scheduled_at(&self, name: JobName, at: DateTime<Utc>) {
        if let Some(mut state) = self.states.get_mut(&name) {
            state.next_scheduled_at = Some(at);
        }
    }

    /// Manually trigger a job, failing if it's already in flight. Runs in
    /// the background; the caller does not wait for completion.
    pub fn trigger(self: &Arc<Self>, name: JobName) -> Result<(), SchedulerError> {
        if self.is_running(name) {
            return Err(SchedulerError::AlreadyRunning(name));
        }
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_job(name).await });
        Ok(())
    }

    async fn run_job(self: Arc<Self>, name: JobName) {
        if self.is_running(name) {
            debug!(job = name.as_str(), "skipping tick: already running");
            return;
        }
        if let Some(mut state) = self.states.get_mut(&name) {
            state.running = true;
        }

        let started = Instant::now();
        let result = match name {
            JobName::SyncFixtures => sync_fixtures::run(&self.ctx).await,
            JobName::SyncOdds => sync_odds::run(&self.ctx).await,
            JobName::SyncLiveScores => sync_live_scores::run(&self.ctx).await,
            JobName::TransitionEvents => transition_events::run(&self.ctx).await,
            JobName::BrowserRotation => {
                self.ctx.browser_pool.recycle_all("scheduled rotation").await;
                Ok(crate::jobs::JobOutcome::success())
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;

        if let Some(mut state) = self.states.get_mut(&name) {
            state.running = false;
            state.last_run_at = Some(Utc::now());
            state.last_duration_ms = Some(elapsed_ms);
            state.run_count += 1;
            match &result {
                Ok(outcome) => {
                    let status = outcome.finalize_status();
                    if status != RunStatus::Success {
                        state.fail_count += 1;
                    }
                    state.last_status = Some(status);
                    state.last_error = None;
                }
                Err(err) => {
                    state.fail_count += 1;
                    state.last_status = Some(RunStatus::Failed);
                    state.last_error = Some(err.to_string());
                    warn!(job = name.as_str(), error = %err, "job failed");
                }
            }
        }
    }

    /// Drives every job's cadence until `shutdown_rx` fires. A disabled
    /// cron (`enable_cron = false`) still accepts manual `trigger()` calls
    /// through the control surface; it just never self-schedules.
    pub async fn run_loop(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        if !self.config.enable_cron {
            info!("cron scheduling disabled, waiting for manual triggers only");
            let _ = shutdown_rx.recv().await;
            return;
        }

        info!("scheduler started");

        let mut next_fixtures = next_daily_occurrence(Utc::now(), self.config.off_peak_tz, self.config.fixtures_hour);
        let mut next_transition = Instant::now() + TRANSITION_EVENTS_INTERVAL;
        let mut next_live_scores = Instant::now() + self.config.live_scores_interval;
        let mut next_rotation = Instant::now() + BROWSER_ROTATION_INTERVAL;
        let mut next_odds = Instant::now() + StdDuration::from_secs(60);

        self.set_next_scheduled_at(JobName::SyncFixtures, next_fixtures);
        self.set_next_scheduled_at(JobName::TransitionEvents, utc_for(next_transition));
        self.set_next_scheduled_at(JobName::SyncLiveScores, utc_for(next_live_scores));
        self.set_next_scheduled_at(JobName::BrowserRotation, utc_for(next_rotation));
        self.set_next_scheduled_at(JobName::SyncOdds, utc_for(next_odds));

        loop {
            let sleep_fixtures = time::sleep_until(instant_for(next_fixtures));
            tokio::select! {
                _ = sleep_fixtures => {
                    self.spawn_tick(JobName::SyncFixtures);
                    next_fixtures = next_daily_occurrence(Utc::now(), self.config.off_peak_tz, self.config.fixtures_hour);
                    self.set_next_scheduled_at(JobName::SyncFixtures, next_fixtures);
                }
                _ = time::sleep_until(next_transition) => {
                    self.spawn_tick(JobName::TransitionEvents);
                    next_transition = Instant::now() + TRANSITION_EVENTS_INTERVAL;
                    self.set_next_scheduled_at(JobName::TransitionEvents, utc_for(next_transition));
                }
                _ = time::sleep_until(next_live_scores) => {
                    self.spawn_tick(JobName::SyncLiveScores);
                    next_live_scores = Instant::now() + self.config.live_scores_interval;
                    self.set_next_scheduled_at(JobName::SyncLiveScores, utc_for(next_live_scores));
                }
                _ = time::sleep_until(next_rotation) => {
                    self.spawn_tick(JobName::BrowserRotation);
                    next_rotation = Instant::now() + BROWSER_ROTATION_INTERVAL;
                    self.set_next_scheduled_at(JobName::BrowserRotation, utc_for(next_rotation));
                }
                _ = time::sleep_until(next_odds) => {
                    self.spawn_tick(JobName::SyncOdds);
                    let delay = self.next_odds_delay().await;
                    next_odds = Instant::now() + delay;
                    self.set_next_scheduled_at(JobName::SyncOdds, utc_for(next_odds));
                }
                _ = shutdown_rx.recv() => {
                    info!("scheduler received shutdown signal");
                    break;
                }
            }
        }
    }

    fn spawn_tick(self: &Arc<Self>, name: JobName) {
        if self.is_running(name) {
            debug!(job = name.as_str(), "tick skipped: previous run still in flight");
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_job(name).await });
    }

    async fn next_odds_delay(&self) -> StdDuration {
        let min_time_to_kickoff = self
            .ctx
            .db
            .scraper_events()
            .min_time_to_kickoff(URGENCY_WINDOW)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to compute time-to-kickoff, defaulting to None urgency");
                None
            });
        let urgency = Urgency::classify(min_time_to_kickoff);
        adaptive::next_delay(urgency, Utc::now(), self.config.off_peak_tz)
    }
}

fn instant_for(target: DateTime<Utc>) -> Instant {
    let remaining = (target - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
    Instant::now() + remaining
}

/// Converts a `tokio::time::Instant` deadline into a wall-clock estimate for
/// exposing `next_scheduled_at` over the control surface.
fn utc_for(target: Instant) -> DateTime<Utc> {
    let remaining = target.saturating_duration_since(Instant::now());
    Utc::now() + ChronoDuration::from_std(remaining).unwrap_or(ChronoDuration::zero())
}

/// Next UTC instant at which it is `hour`:00 local time in `tz`, at least a
/// minute from now (so a restart at 03:00:30 doesn't immediately re-fire).
fn next_daily_occurrence(now: DateTime<Utc>, tz: Tz, hour: u32) -> DateTime<Utc> {
    use chrono::TimeZone;
    let local_now = now.with_timezone(&tz);
    let mut candidate = tz
        .with_ymd_and_hms(local_now.year(), local_now.month(), local_now.day(), hour, 0, 0)
        .single()
        .unwrap_or(local_now);
    if candidate <= local_now + chrono::Duration::minutes(1) {
        candidate += chrono::Duration::days(1);
    }
    candidate.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_daily_occurrence_rolls_to_tomorrow_when_past() {
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let next = next_daily_occurrence(now, chrono_tz::Europe::London, 3);
        assert_eq!(next.with_timezone(&chrono_tz::Europe::London).day(), 6);
    }

    #[test]
    fn next_daily_occurrence_stays_today_when_still_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 1, 0, 0).unwrap();
        let next = next_daily_occurrence(now, chrono_tz::Europe::London, 3);
        assert_eq!(next.with_timezone(&chrono_tz::Europe::London).day(), 5);
    }
}
