//! Odds source registry (component E).
//!
//! Each source knows how to scrape a handful of sports from one domain. The
//! registry holds them in priority order and exposes the shared NO_DATA vs
//! BOT_BLOCKED pattern catalogs that every source consults when a scrape
//! comes back with zero rows.

pub mod football_exchange;
pub mod live_scores_api;
pub mod registry;

use async_trait::async_trait;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};

use crate::browser::BrowserPool;
use crate::error::ScrapeError;

/// A single sport's worth of odds, scraped from one source, not yet resolved
/// against stored `Event`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOdds {
    pub sport: String,
    pub competition: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub scheduled_start: chrono::DateTime<chrono::Utc>,
    pub market_type: String,
    pub line: Option<f64>,
    pub outcomes: Vec<NormalizedOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOutcome {
    pub name: String,
    pub odds: f64,
}

/// Result of scraping one (source, sport) pair.
///
/// A zero-row scrape is not automatically a failure: `ScrapeError::NoDataAvailable`
/// and `ScrapeError::BotBlocked` are distinct, non-exception outcomes so job
/// code never needs to downcast an error to tell them apart.
pub type ScrapeOutcome = Result<Vec<NormalizedOdds>, ScrapeError>;

/// One in-play update surfaced by a live-scores source: current score,
/// clock, and whether the match has concluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveScoreUpdate {
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub minute: Option<i32>,
    pub period: Option<String>,
    pub finished: bool,
}

/// A lightweight source for `sync-live-scores`. Deliberately not a browser
/// source — this runs every minute and must not hold a browser context.
#[async_trait]
pub trait LiveScoreSource: Send + Sync {
    fn name(&self) -> &str;
    fn enabled(&self) -> bool;
    async fn fetch_live(&self, sport: &str) -> Result<Vec<LiveScoreUpdate>, ScrapeError>;
}

/// One configured odds source.
#[async_trait]
pub trait OddsSource: Send + Sync {
    fn name(&self) -> &str;
    fn domain(&self) -> &str;
    fn enabled(&self) -> bool;
    fn priority(&self) -> u32;
    fn cooldown_minutes(&self) -> u32;

    /// Up to 3 fallback URLs for this sport, tried in order until the source
    /// collects at least 20 events or the list is exhausted.
    fn sport_urls(&self, sport: &str) -> Vec<String>;

    async fn scrape(&self, pool: &BrowserPool, page: &mut Option<Page>, sport: &str) -> ScrapeOutcome;
}

/// Phrases indicating the page loaded but genuinely has nothing to show,
/// e.g. an off-season notice. Checked only after `BOT_BLOCKED_PATTERNS`
/// finds no match, since several phrases ("too many requests") could
/// plausibly read as either and the blocked interpretation must win.
pub const NO_DATA_PATTERNS: &[&str] = &[
    "no events found",
    "no matches scheduled",
    "check back later",
    "no odds available",
    "nothing to display",
    "season has not started",
];

/// Phrases indicating a bot-detection or rate-limit challenge page.
pub const BOT_BLOCKED_PATTERNS: &[&str] = &[
    "too many requests",
    "access denied",
    "unusual traffic",
    "please verify you are a human",
    "captcha",
    "request blocked",
    "forbidden",
];

/// Classify a zero-row page body. `BOT_BLOCKED_PATTERNS` is checked first —
/// ordering is load-bearing since some phrases overlap across catalogs.
pub fn classify_empty_page(body: &str) -> ScrapeError {
    let lower = body.to_lowercase();
    for pattern in BOT_BLOCKED_PATTERNS {
        if lower.contains(pattern) {
            return ScrapeError::BotBlocked {
                reason: (*pattern).to_string(),
            };
        }
    }
    for pattern in NO_DATA_PATTERNS {
        if lower.contains(pattern) {
            return ScrapeError::NoDataAvailable;
        }
    }
    ScrapeError::NoDataAvailable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_pattern_wins_over_overlapping_no_data_phrase() {
        let body = "Error: too many requests from your network, please check back later";
        match classify_empty_page(body) {
            ScrapeError::BotBlocked { .. } => {}
            other => panic!("expected BotBlocked, got {other:?}"),
        }
    }

    #[test]
    fn plain_no_data_page_classified_as_no_data() {
        let body = "No events found for this competition. Check back later.";
        matches!(classify_empty_page(body), ScrapeError::NoDataAvailable);
    }

    #[test]
    fn unrecognized_empty_page_defaults_to_no_data() {
        let body = "an empty page with no known markers";
        matches!(classify_empty_page(body), ScrapeError::NoDataAvailable);
    }
}
