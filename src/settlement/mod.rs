//! Settlement queue hand-off (ambient feature, SPEC_FULL.md F.2.2).
//!
//! `sync-live-scores` enqueues a settlement message once an event finishes;
//! a separate consumer (out of scope here) actually grades bets against it.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct SettlementMessage {
    pub event_id: i64,
    pub home_score: i32,
    pub away_score: i32,
}

#[async_trait]
pub trait SettlementQueue: Send + Sync {
    async fn enqueue(&self, message: SettlementMessage) -> anyhow::Result<()>;
}

/// Posts the settlement message as JSON to a configured HTTP endpoint.
pub struct HttpSettlementQueue {
    http: reqwest::Client,
    url: String,
}

impl HttpSettlementQueue {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl SettlementQueue for HttpSettlementQueue {
    async fn enqueue(&self, message: SettlementMessage) -> anyhow::Result<()> {
        let resp = self.http.post(&self.url).json(&message).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("settlement queue POST failed with {}", resp.status());
        }
        Ok(())
    }
}

/// Used when `SETTLEMENT_QUEUE_URL` is unset; logs and drops the message
/// rather than failing the job that produced it.
pub struct NoopSettlementQueue;

#[async_trait]
impl SettlementQueue for NoopSettlementQueue {
    async fn enqueue(&self, message: SettlementMessage) -> anyhow::Result<()> {
        warn!(event_id = message.event_id, "no settlement queue configured, dropping message");
        Ok(())
    }
}

pub type SharedSettlementQueue = std::sync::Arc<dyn SettlementQueue>;
