//! Row types for the scraper's Postgres schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Live,
    Finished,
    Cancelled,
    Postponed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "market_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    MatchWinner,
    OverUnderGoals,
    BothTeamsToScore,
    CorrectScore,
    HandicapSpread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "run_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "alert_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sport {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Competition {
    pub id: i64,
    pub sport_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Team {
    pub id: i64,
    pub sport_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamAlias {
    pub id: i64,
    pub team_id: i64,
    pub alias: String,
    pub source_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: i64,
    pub sport_id: i64,
    pub competition_id: Option<i64>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub scheduled_start: DateTime<Utc>,
    pub status: EventStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub period: Option<String>,
    pub minute: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Market {
    pub id: i64,
    pub event_id: i64,
    pub market_type: MarketType,
    pub line: Option<f64>,
    pub suspended: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Outcome {
    pub id: i64,
    pub market_id: i64,
    pub name: String,
    pub current_odds: f64,
    pub previous_odds: Option<f64>,
    pub is_winner: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScraperRun {
    pub id: i64,
    pub job_type: String,
    pub source: Option<String>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub items_processed: i32,
    pub items_failed: i32,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScraperAlert {
    pub id: i64,
    pub severity: AlertSeverity,
    pub message: String,
    pub run_id: Option<i64>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

/// A candidate event returned by `candidates_for_odds`/`candidates_for_live`.
#[derive(Debug, Clone, FromRow)]
pub struct EventCandidate {
    pub id: i64,
    pub sport_slug: String,
    pub home_team: String,
    pub away_team: String,
    pub scheduled_start: DateTime<Utc>,
}
