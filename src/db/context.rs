//! Database context with automatic event emission.

use sqlx::PgPool;
use std::sync::Arc;

use crate::db::aliases::AliasOps;
use crate::db::alerts::AlertOps;
use crate::db::events::EventOps;
use crate::db::markets::MarketOps;
use crate::db::runs::RunOps;
use crate::db::teams::TeamOps;
use crate::events::EventBuffer;

/// Database context that wraps pool and event buffer.
///
/// All database operations that should emit events go through this context.
#[derive(Clone)]
pub struct DbContext {
    pool: PgPool,
    events: Arc<EventBuffer>,
}

impl DbContext {
    /// Create a new DbContext.
    pub fn new(pool: PgPool, events: Arc<EventBuffer>) -> Self {
        Self { pool, events }
    }

    /// Get the underlying database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the event buffer.
    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn scraper_events(&self) -> EventOps<'_> {
        EventOps::new(self)
    }

    pub fn markets(&self) -> MarketOps<'_> {
        MarketOps::new(self)
    }

    pub fn teams(&self) -> TeamOps<'_> {
        TeamOps::new(self)
    }

    pub fn aliases(&self) -> AliasOps<'_> {
        AliasOps::new(self)
    }

    pub fn runs(&self) -> RunOps<'_> {
        RunOps::new(self)
    }

    pub fn alerts(&self) -> AlertOps<'_> {
        AlertOps::new(self)
    }
}
