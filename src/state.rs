//! Application state shared across services (scheduler, control surface).

use std::sync::Arc;
use std::time::Instant;

use crate::browser::BrowserPool;
use crate::db::DbContext;
use crate::metrics::{MetricsRegistry, ServiceStatusRegistry};
use crate::proxy::SharedProxyRotator;
use crate::scheduler::SharedScheduler;

#[derive(Clone)]
pub struct AppState {
    pub db: DbContext,
    pub scheduler: SharedScheduler,
    pub browser_pool: Arc<BrowserPool>,
    pub proxy_rotator: SharedProxyRotator,
    pub service_statuses: ServiceStatusRegistry,
    pub metrics: MetricsRegistry,
    pub started_at: Instant,
}
