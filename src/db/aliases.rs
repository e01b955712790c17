//! `TeamAlias` lookups and write-back.

use crate::db::DbContext;
use crate::error::Result;

pub struct AliasOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> AliasOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Canonical team name for a normalized alias string, if one is on file.
    pub async fn lookup(&self, sport_id: i64, normalized_alias: &str) -> Result<Option<String>> {
        let name = sqlx::query_scalar(
            "SELECT t.name FROM team_aliases a \
             JOIN teams t ON t.id = a.team_id \
             WHERE t.sport_id = $1 AND a.alias = $2",
        )
        .bind(sport_id)
        .bind(normalized_alias)
        .fetch_optional(self.ctx.pool())
        .await?;
        Ok(name)
    }

    /// All aliases for a sport, keyed by normalized alias string, for
    /// preloading into a `resolver::PreloadedAliases` before a scrape batch.
    pub async fn all_for_sport(&self, sport_id: i64) -> Result<std::collections::HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT a.alias, t.name FROM team_aliases a \
             JOIN teams t ON t.id = a.team_id \
             WHERE t.sport_id = $1",
        )
        .bind(sport_id)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Record an opportunistic alias, ignoring if it already exists.
    pub async fn insert_alias(&self, team_id: i64, alias: &str, source_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO team_aliases (team_id, alias, source_name) VALUES ($1, $2, $3) \
             ON CONFLICT (team_id, alias) DO NOTHING",
        )
        .bind(team_id)
        .bind(alias)
        .bind(source_name)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }
}
