//! HTTP control surface (component I).
//!
//! A small operational API sitting alongside the scheduler: health check,
//! per-job status, manual triggers, and a forced context-recycle hook. Not
//! the scraped data's public API — that's out of scope (see spec
//! Non-goals).

mod error;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::trace;

use crate::browser::{BrowserPool, ContextStats};
use crate::jobs::JobName;
use crate::proxy::SharedProxyRotator;
use crate::scheduler::{JobStatus, SchedulerError, SharedScheduler};

pub use error::{ControlError, ControlErrorCode};

#[derive(Clone)]
pub struct ControlState {
    pub scheduler: SharedScheduler,
    pub browser_pool: Arc<BrowserPool>,
    pub proxy_rotator: SharedProxyRotator,
    pub started_at: Instant,
}

pub fn create_router(state: ControlState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{name}/trigger", post(trigger_job))
        .route("/contexts", get(list_contexts))
        .route("/contexts/recycle", post(recycle_contexts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(10)))
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    uptime_secs: u64,
    context_stats: Vec<ContextStats>,
    proxy_enabled: bool,
}

async fn health(State(state): State<ControlState>) -> Json<HealthResponse> {
    trace!("health check requested");
    Json(HealthResponse {
        ok: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        context_stats: state.browser_pool.stats().await,
        proxy_enabled: state.proxy_rotator.is_enabled(),
    })
}

#[derive(Serialize)]
struct JobsResponse {
    jobs: Vec<JobStatus>,
}

async fn list_jobs(State(state): State<ControlState>) -> Json<JobsResponse> {
    Json(JobsResponse {
        jobs: state.scheduler.status_all(),
    })
}

fn parse_job_name(raw: &str) -> Result<JobName, ControlError> {
    JobName::all()
        .iter()
        .copied()
        .find(|name| name.as_str() == raw)
        .ok_or_else(|| ControlError::not_found(format!("unknown job: {raw}")))
}

async fn trigger_job(
    State(state): State<ControlState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ControlError> {
    let job = parse_job_name(&name)?;
    match state.scheduler.trigger(job) {
        Ok(()) => Ok(Json(json!({ "triggered": job.as_str() }))),
        Err(SchedulerError::AlreadyRunning(job)) => Err(ControlError::conflict(format!(
            "{} is already running",
            job.as_str()
        ))),
    }
}

#[derive(Serialize)]
struct ContextsResponse {
    contexts: Vec<ContextStats>,
}

async fn list_contexts(State(state): State<ControlState>) -> Json<ContextsResponse> {
    Json(ContextsResponse {
        contexts: state.browser_pool.stats().await,
    })
}

async fn recycle_contexts(State(state): State<ControlState>) -> Json<Value> {
    state.browser_pool.recycle_all("manual control-surface request").await;
    Json(json!({ "recycled": true }))
}
