//! `Sport`/`Competition`/`Team` taxonomy upserts.

use crate::db::DbContext;
use crate::db::models::{Competition, Sport, Team};
use crate::error::Result;

pub struct TeamOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> TeamOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    pub async fn upsert_sport(&self, slug: &str, name: &str) -> Result<Sport> {
        let sport = sqlx::query_as::<_, Sport>(
            "INSERT INTO sports (slug, name) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name \
             RETURNING *",
        )
        .bind(slug)
        .bind(name)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(sport)
    }

    pub async fn upsert_competition(&self, sport_id: i64, name: &str) -> Result<Competition> {
        let competition = sqlx::query_as::<_, Competition>(
            "INSERT INTO competitions (sport_id, name) VALUES ($1, $2) \
             ON CONFLICT (sport_id, name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING *",
        )
        .bind(sport_id)
        .bind(name)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(competition)
    }

    pub async fn upsert_team(&self, sport_id: i64, name: &str) -> Result<Team> {
        let team = sqlx::query_as::<_, Team>(
            "INSERT INTO teams (sport_id, name) VALUES ($1, $2) \
             ON CONFLICT (sport_id, name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING *",
        )
        .bind(sport_id)
        .bind(name)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(team)
    }
}
