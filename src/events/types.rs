//! Domain event types.

use crate::db::models::{AlertSeverity, RunStatus};

/// Unified enum for all domain events published through `EventBuffer`.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    ScraperRun(ScraperRunEvent),
    Event(EventLifecycleEvent),
    Alert(AlertEvent),
}

/// Lifecycle of a `ScraperRun` row.
#[derive(Debug, Clone)]
pub enum ScraperRunEvent {
    Started {
        run_id: i64,
        job_type: String,
    },
    Completed {
        run_id: i64,
        status: RunStatus,
        items_processed: i32,
        items_failed: i32,
    },
}

/// Changes to an `Event` row as odds/scores/status are updated.
#[derive(Debug, Clone)]
pub enum EventLifecycleEvent {
    Created { event_id: i64 },
    OddsUpdated { event_id: i64, market_id: i64 },
    TransitionedToLive { event_id: i64 },
    Finished { event_id: i64, home_score: i32, away_score: i32 },
}

/// A raised `ScraperAlert`.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub alert_id: i64,
    pub severity: AlertSeverity,
    pub message: String,
}
