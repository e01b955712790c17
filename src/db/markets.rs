//! `Market`/`Outcome` row operations with automatic event emission.

use crate::db::DbContext;
use crate::db::models::{Market, MarketType};
use crate::error::Result;
use crate::events::{DomainEvent, EventLifecycleEvent};

pub struct MarketOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> MarketOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    pub async fn upsert_market(
        &self,
        event_id: i64,
        market_type: MarketType,
        line: Option<f64>,
    ) -> Result<Market> {
        let market = sqlx::query_as::<_, Market>(
            r#"
            INSERT INTO markets (event_id, market_type, line, suspended)
            VALUES ($1, $2, $3, false)
            ON CONFLICT (event_id, market_type, line) DO UPDATE SET suspended = markets.suspended
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(market_type)
        .bind(line)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(market)
    }

    /// Replace current odds for a market's outcomes in one round trip.
    ///
    /// Shifts each outcome's prior `current_odds` into `previous_odds` before
    /// writing the new value, via UNNEST over the parallel name/odds arrays.
    pub async fn upsert_outcomes(&self, market_id: i64, outcomes: &[(String, f64)]) -> Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }

        let names: Vec<String> = outcomes.iter().map(|(name, _)| name.clone()).collect();
        let odds: Vec<f64> = outcomes.iter().map(|(_, odds)| *odds).collect();

        sqlx::query(
            r#"
            INSERT INTO outcomes (market_id, name, current_odds, previous_odds)
            SELECT $1, v.name, v.odds, NULL
            FROM UNNEST($2::text[], $3::double precision[]) AS v(name, odds)
            ON CONFLICT (market_id, name) DO UPDATE
                SET previous_odds = outcomes.current_odds,
                    current_odds = EXCLUDED.current_odds
            "#,
        )
        .bind(market_id)
        .bind(&names)
        .bind(&odds)
        .execute(self.ctx.pool())
        .await?;

        self.ctx.events().publish(DomainEvent::Event(EventLifecycleEvent::OddsUpdated {
            event_id: self.event_id_for_market(market_id).await?,
            market_id,
        }));
        Ok(())
    }

    pub async fn set_suspended(&self, market_id: i64, suspended: bool) -> Result<()> {
        sqlx::query("UPDATE markets SET suspended = $2 WHERE id = $1")
            .bind(market_id)
            .bind(suspended)
            .execute(self.ctx.pool())
            .await?;
        Ok(())
    }

    async fn event_id_for_market(&self, market_id: i64) -> Result<i64> {
        let event_id = sqlx::query_scalar("SELECT event_id FROM markets WHERE id = $1")
            .bind(market_id)
            .fetch_one(self.ctx.pool())
            .await?;
        Ok(event_id)
    }
}
