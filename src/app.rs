use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use figment::value::UncasedStr;
use figment::{Figment, providers::Env};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use tracing::info;

use crate::browser::BrowserPool;
use crate::config::Config;
use crate::db::DbContext;
use crate::events::EventBuffer;
use crate::jobs::JobContext;
use crate::metrics::{MetricsRegistry, ServiceStatusRegistry};
use crate::proxy::ProxyRotator;
use crate::ratelimit::RateLimitDetector;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::services::control::ControlService;
use crate::services::manager::ServiceManager;
use crate::services::scheduler::SchedulerService;
use crate::settlement::{HttpSettlementQueue, NoopSettlementQueue, SharedSettlementQueue};
use crate::sources::football_exchange::FootballExchangeSource;
use crate::sources::live_scores_api::LiveScoresApiSource;
use crate::sources::registry::SourceRegistry;
use crate::state::AppState;

/// Event buffer capacity: enough recent domain events to cover a slow
/// control-surface poller without growing unbounded.
const EVENT_BUFFER_CAPACITY: usize = 2048;
/// Max concurrent browser contexts the pool maintains.
const MAX_BROWSER_CONTEXTS: usize = 3;

/// Top-level application: owns configuration, the database pool, and the
/// service manager that runs the scheduler and control surface.
pub struct App {
    config: Config,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    pub async fn new() -> Result<Self, anyhow::Error> {
        let config: Config = Figment::new()
            .merge(Env::raw().map(|k| {
                if k == UncasedStr::new("RAILWAY_DEPLOYMENT_DRAINING_SECONDS") {
                    "SHUTDOWN_TIMEOUT".into()
                } else {
                    k.into()
                }
            }))
            .extract()
            .context("Failed to load config")?;

        let database_url = config.resolve_database_url()?;
        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect(&database_url)
            .await
            .context("Failed to create database pool")?;

        info!("running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("database migrations completed");

        let event_buffer = Arc::new(EventBuffer::new(EVENT_BUFFER_CAPACITY));
        let db = DbContext::new(db_pool, event_buffer);

        let proxy_rotator = Arc::new(ProxyRotator::new(&config.proxy_providers()));
        let browser_pool = Arc::new(BrowserPool::new(MAX_BROWSER_CONTEXTS, Some(proxy_rotator.clone())));
        let rate_limiter = Arc::new(RateLimitDetector::new());
        let metrics = MetricsRegistry::new();
        let service_statuses = ServiceStatusRegistry::new();

        let settlement: SharedSettlementQueue = match &config.settlement_queue_url {
            Some(url) => Arc::new(HttpSettlementQueue::new(url.clone())),
            None => Arc::new(NoopSettlementQueue),
        };

        let mut odds_sources: Vec<Arc<dyn crate::sources::OddsSource>> = vec![Arc::new(FootballExchangeSource {
            base_url: "https://www.football-exchange.example".to_string(),
            priority: 10,
            enabled: true,
        })];
        let live_scores: Option<Arc<dyn crate::sources::LiveScoreSource>> = config.odds_api_key.as_ref().map(|key| {
            let source = Arc::new(LiveScoresApiSource::new(key.clone(), 20));
            odds_sources.push(source.clone());
            source as Arc<dyn crate::sources::LiveScoreSource>
        });
        let sources = Arc::new(SourceRegistry::new(odds_sources));

        let job_ctx = JobContext {
            db: db.clone(),
            sources,
            browser_pool: browser_pool.clone(),
            proxy_rotator: proxy_rotator.clone(),
            rate_limiter,
            settlement,
            live_scores,
            metrics: metrics.clone(),
        };

        let scheduler_config = SchedulerConfig {
            enable_cron: config.enable_cron,
            ..SchedulerConfig::default()
        };
        let scheduler = Arc::new(Scheduler::new(job_ctx, scheduler_config));

        let app_state = AppState {
            db,
            scheduler,
            browser_pool,
            proxy_rotator,
            service_statuses,
            metrics,
            started_at: std::time::Instant::now(),
        };

        Ok(App {
            config,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    /// Register the scheduler and control-surface services with the manager.
    pub fn setup_services(&mut self) {
        let scheduler_service = Box::new(SchedulerService::new(self.app_state.clone()));
        let control_service = Box::new(ControlService::new(self.config.port, self.app_state.clone()));

        self.service_manager.register_service("scheduler", scheduler_service);
        self.service_manager.register_service("control", control_service);
    }

    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    pub async fn run(self) -> ExitCode {
        use crate::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
