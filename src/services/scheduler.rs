use tokio::sync::broadcast;
use tracing::warn;

use super::Service;
use crate::metrics::ServiceStatus;
use crate::state::AppState;

/// Drives the job scheduler's cron-like cadence for the life of the process.
pub struct SchedulerService {
    app_state: AppState,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl SchedulerService {
    pub fn new(app_state: AppState) -> Self {
        Self {
            app_state,
            shutdown_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl Service for SchedulerService {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        self.app_state.service_statuses.set("scheduler", ServiceStatus::Active);
        self.app_state.scheduler.clone().run_loop(shutdown_rx).await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        self.app_state.service_statuses.set("scheduler", ServiceStatus::Disabled);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        } else {
            warn!(service = "scheduler", "no shutdown channel found");
        }
        Ok(())
    }
}
