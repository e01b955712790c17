//! `Event` row operations with automatic event emission.

use chrono::{DateTime, Utc};

use crate::db::DbContext;
use crate::db::models::{Event, EventCandidate, EventStatus};
use crate::error::Result;
use crate::events::{DomainEvent, EventLifecycleEvent};

pub struct EventOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> EventOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Insert or update the event identified by (sport, competition, home, away, start).
    ///
    /// Emits `EventLifecycleEvent::Created` only on first insert.
    pub async fn upsert_event(
        &self,
        sport_id: i64,
        competition_id: Option<i64>,
        home_team_id: i64,
        away_team_id: i64,
        scheduled_start: DateTime<Utc>,
    ) -> Result<Event> {
        let existing = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE sport_id = $1 AND home_team_id = $2 \
             AND away_team_id = $3 AND scheduled_start = $4",
        )
        .bind(sport_id)
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(scheduled_start)
        .fetch_optional(self.ctx.pool())
        .await?;

        if let Some(event) = existing {
            if competition_id.is_some() && competition_id != event.competition_id {
                sqlx::query("UPDATE events SET competition_id = $2 WHERE id = $1")
                    .bind(event.id)
                    .bind(competition_id)
                    .execute(self.ctx.pool())
                    .await?;
            }
            return Ok(event);
        }

        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (sport_id, competition_id, home_team_id, away_team_id, scheduled_start, status)
            VALUES ($1, $2, $3, $4, $5, 'scheduled')
            RETURNING *
            "#,
        )
        .bind(sport_id)
        .bind(competition_id)
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(scheduled_start)
        .fetch_one(self.ctx.pool())
        .await?;

        self.ctx
            .events()
            .publish(DomainEvent::Event(EventLifecycleEvent::Created { event_id: event.id }));
        Ok(event)
    }

    /// Flip every `scheduled` event whose kickoff has passed to `live`.
    ///
    /// Emits `TransitionedToLive` for each row affected.
    pub async fn transition_scheduled_to_live(&self, now: DateTime<Utc>) -> Result<u64> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "UPDATE events SET status = 'live' \
             WHERE status = 'scheduled' AND scheduled_start <= $1 \
             RETURNING id",
        )
        .bind(now)
        .fetch_all(self.ctx.pool())
        .await?;

        for &id in &ids {
            self.ctx
                .events()
                .publish(DomainEvent::Event(EventLifecycleEvent::TransitionedToLive { event_id: id }));
        }
        Ok(ids.len() as u64)
    }

    /// Mark an event finished with its final score.
    pub async fn mark_finished(
        &self,
        event_id: i64,
        home_score: i32,
        away_score: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE events SET status = 'finished', home_score = $2, away_score = $3 WHERE id = $1",
        )
        .bind(event_id)
        .bind(home_score)
        .bind(away_score)
        .execute(self.ctx.pool())
        .await?;

        self.ctx.events().publish(DomainEvent::Event(EventLifecycleEvent::Finished {
            event_id,
            home_score,
            away_score,
        }));
        Ok(())
    }

    /// Update live score/minute/period for an in-progress event.
    pub async fn update_live_state(
        &self,
        event_id: i64,
        home_score: i32,
        away_score: i32,
        minute: Option<i32>,
        period: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE events SET home_score = $2, away_score = $3, minute = $4, period = $5 WHERE id = $1",
        )
        .bind(event_id)
        .bind(home_score)
        .bind(away_score)
        .bind(minute)
        .bind(period)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Events for `sport_id` starting within `window` from now; candidates for `sync-odds`.
    pub async fn candidates_for_odds(
        &self,
        sport_id: i64,
        window: chrono::Duration,
    ) -> Result<Vec<EventCandidate>> {
        let rows = sqlx::query_as::<_, EventCandidate>(
            r#"
            SELECT e.id, s.slug AS sport_slug, ht.name AS home_team, at.name AS away_team, e.scheduled_start
            FROM events e
            JOIN sports s ON s.id = e.sport_id
            JOIN teams ht ON ht.id = e.home_team_id
            JOIN teams at ON at.id = e.away_team_id
            WHERE e.sport_id = $1
              AND e.status = 'scheduled'
              AND e.scheduled_start BETWEEN NOW() AND NOW() + $2
            ORDER BY e.scheduled_start ASC
            "#,
        )
        .bind(sport_id)
        .bind(sqlx::postgres::types::PgInterval::try_from(window).map_err(|err| anyhow::anyhow!(err))?)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Events currently live, or scheduled with a kickoff already in the past.
    pub async fn candidates_for_live(&self) -> Result<Vec<EventCandidate>> {
        let rows = sqlx::query_as::<_, EventCandidate>(
            r#"
            SELECT e.id, s.slug AS sport_slug, ht.name AS home_team, at.name AS away_team, e.scheduled_start
            FROM events e
            JOIN sports s ON s.id = e.sport_id
            JOIN teams ht ON ht.id = e.home_team_id
            JOIN teams at ON at.id = e.away_team_id
            WHERE e.status = 'live' OR (e.status = 'scheduled' AND e.scheduled_start <= NOW())
            ORDER BY e.scheduled_start ASC
            "#,
        )
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Minimum time-to-kickoff among scheduled events starting within `window`
    /// from now, across every sport. Feeds the `sync-odds` urgency classifier.
    pub async fn min_time_to_kickoff(&self, window: chrono::Duration) -> Result<Option<chrono::Duration>> {
        let start: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MIN(scheduled_start) FROM events \
             WHERE status = 'scheduled' AND scheduled_start BETWEEN NOW() AND NOW() + $1",
        )
        .bind(sqlx::postgres::types::PgInterval::try_from(window).map_err(|err| anyhow::anyhow!(err))?)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(start.map(|s| s - Utc::now()))
    }

    /// `(home_team_id, away_team_id)` for an event, used to attach a
    /// write-back alias to the correct canonical team after a fuzzy match.
    pub async fn team_ids(&self, event_id: i64) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT home_team_id, away_team_id FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(row)
    }

    pub async fn status(&self, event_id: i64) -> Result<Option<EventStatus>> {
        let status = sqlx::query_scalar("SELECT status FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(self.ctx.pool())
            .await?;
        Ok(status)
    }
}
