//! `ScraperAlert` creation with automatic event emission.

use crate::db::DbContext;
use crate::db::models::AlertSeverity;
use crate::error::Result;
use crate::events::{AlertEvent, DomainEvent};

pub struct AlertOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> AlertOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    pub async fn insert_alert(
        &self,
        severity: AlertSeverity,
        message: &str,
        run_id: Option<i64>,
    ) -> Result<i64> {
        let alert_id: i64 = sqlx::query_scalar(
            "INSERT INTO scraper_alerts (severity, message, run_id, acknowledged, created_at) \
             VALUES ($1, $2, $3, false, NOW()) RETURNING id",
        )
        .bind(severity)
        .bind(message)
        .bind(run_id)
        .fetch_one(self.ctx.pool())
        .await?;

        self.ctx.events().publish(DomainEvent::Alert(AlertEvent {
            alert_id,
            severity,
            message: message.to_string(),
        }));
        Ok(alert_id)
    }

    pub async fn acknowledge(&self, alert_id: i64) -> Result<()> {
        sqlx::query("UPDATE scraper_alerts SET acknowledged = true WHERE id = $1")
            .bind(alert_id)
            .execute(self.ctx.pool())
            .await?;
        Ok(())
    }
}
