use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, trace, warn};

use super::Service;
use crate::control::{self, ControlState};
use crate::metrics::ServiceStatus;
use crate::state::AppState;

/// Runs the HTTP control surface (health, job status, manual triggers).
pub struct ControlService {
    port: u16,
    app_state: AppState,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl ControlService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self {
            port,
            app_state,
            shutdown_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl Service for ControlService {
    fn name(&self) -> &'static str {
        "control"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let app = control::create_router(ControlState {
            scheduler: self.app_state.scheduler.clone(),
            browser_pool: self.app_state.browser_pool.clone(),
            proxy_rotator: self.app_state.proxy_rotator.clone(),
            started_at: self.app_state.started_at,
        });

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        self.app_state.service_statuses.set("control", ServiceStatus::Active);
        info!(service = "control", address = %addr, "control surface listening");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                trace!(service = "control", "received shutdown signal");
            })
            .await?;

        info!(service = "control", "control surface stopped");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        } else {
            warn!(service = "control", "no shutdown channel found");
        }
        Ok(())
    }
}
