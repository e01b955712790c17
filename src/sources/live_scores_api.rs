//! Lightweight, non-browser odds/score source backed by a plain HTTP API.
//!
//! Used for `sync-live-scores`, which must not pull a browser context for
//! every minute-by-minute poll. Activated only when `ODDS_API_KEY` is set.

use async_trait::async_trait;
use chromiumoxide::Page;
use serde::Deserialize;
use tracing::debug;

use crate::browser::BrowserPool;
use crate::error::ScrapeError;

use super::{LiveScoreSource, LiveScoreUpdate, NormalizedOdds, NormalizedOutcome, OddsSource, ScrapeOutcome};

const BASE_URL: &str = "https://api.the-odds-api.example/v4";

pub struct LiveScoresApiSource {
    http: reqwest::Client,
    api_key: String,
    priority: u32,
}

impl LiveScoresApiSource {
    pub fn new(api_key: String, priority: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            priority,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    home_team: String,
    away_team: String,
    commence_time: chrono::DateTime<chrono::Utc>,
    bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Deserialize)]
struct ApiBookmaker {
    markets: Vec<ApiMarket>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    key: String,
    outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Deserialize)]
struct ApiOutcome {
    name: String,
    price: f64,
}

#[async_trait]
impl OddsSource for LiveScoresApiSource {
    fn name(&self) -> &str {
        "odds-api-fallback"
    }

    fn domain(&self) -> &str {
        "api.the-odds-api.example"
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn cooldown_minutes(&self) -> u32 {
        1
    }

    fn sport_urls(&self, sport: &str) -> Vec<String> {
        vec![format!("{BASE_URL}/sports/{sport}/odds")]
    }

    async fn scrape(&self, _pool: &BrowserPool, _page: &mut Option<Page>, sport: &str) -> ScrapeOutcome {
        let url = self.sport_urls(sport).remove(0);
        let resp = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("regions", "uk")])
            .send()
            .await
            .map_err(|e| ScrapeError::Transient(e.into()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::BotBlocked {
                reason: format!("http {status}"),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::Transient(anyhow::anyhow!("http {status}")));
        }

        let events: Vec<ApiEvent> = resp.json().await.map_err(|e| ScrapeError::Transient(e.into()))?;
        if events.is_empty() {
            return Err(ScrapeError::NoDataAvailable);
        }

        debug!(sport, count = events.len(), "fetched events from odds API fallback");

        let normalized = events
            .into_iter()
            .filter_map(|event| {
                let market = event
                    .bookmakers
                    .first()?
                    .markets
                    .iter()
                    .find(|m| m.key == "h2h")?;
                Some(NormalizedOdds {
                    sport: sport.to_string(),
                    competition: None,
                    home_team: event.home_team,
                    away_team: event.away_team,
                    scheduled_start: event.commence_time,
                    market_type: "match_winner".to_string(),
                    line: None,
                    outcomes: market
                        .outcomes
                        .iter()
                        .map(|o| NormalizedOutcome {
                            name: o.name.clone(),
                            odds: o.price,
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(normalized)
    }
}

#[derive(Debug, Deserialize)]
struct ApiScoreEvent {
    home_team: String,
    away_team: String,
    scores: Option<Vec<ApiScoreEntry>>,
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct ApiScoreEntry {
    name: String,
    score: String,
}

#[async_trait]
impl LiveScoreSource for LiveScoresApiSource {
    fn name(&self) -> &str {
        "odds-api-fallback"
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch_live(&self, sport: &str) -> Result<Vec<LiveScoreUpdate>, ScrapeError> {
        let url = format!("{BASE_URL}/sports/{sport}/scores");
        let resp = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("daysFrom", "1")])
            .send()
            .await
            .map_err(|e| ScrapeError::Transient(e.into()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::BotBlocked {
                reason: format!("http {status}"),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::Transient(anyhow::anyhow!("http {status}")));
        }

        let events: Vec<ApiScoreEvent> = resp.json().await.map_err(|e| ScrapeError::Transient(e.into()))?;
        if events.is_empty() {
            return Err(ScrapeError::NoDataAvailable);
        }

        let updates = events
            .into_iter()
            .filter_map(|event| {
                let scores = event.scores?;
                let home = scores.iter().find(|s| s.name == event.home_team)?;
                let away = scores.iter().find(|s| s.name == event.away_team)?;
                Some(LiveScoreUpdate {
                    home_team: event.home_team,
                    away_team: event.away_team,
                    home_score: home.score.parse().ok()?,
                    away_score: away.score.parse().ok()?,
                    minute: None,
                    period: None,
                    finished: event.completed,
                })
            })
            .collect();

        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_api_key() {
        let source = LiveScoresApiSource::new(String::new(), 1);
        assert!(!OddsSource::enabled(&source));
    }

    #[test]
    fn enabled_with_api_key() {
        let source = LiveScoresApiSource::new("key".to_string(), 1);
        assert!(OddsSource::enabled(&source));
    }
}
