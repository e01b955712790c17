//! Structured per-job logging and in-process metrics (component A).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tracing::Span;
use uuid::Uuid;

/// Health status of a service, self-reported to the registry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Disabled,
    Error,
}

#[derive(Debug, Clone)]
struct StatusEntry {
    status: ServiceStatus,
    updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status.clone())
    }

    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.clone()))
            .collect()
    }
}

/// Per-(job, source) counters tracked for the life of the process.
#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    successes: AtomicU64,
    blocked: AtomicU64,
    no_data: AtomicU64,
    failures: AtomicU64,
    last_duration_ms: AtomicI64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub blocked: u64,
    pub no_data: u64,
    pub failures: u64,
    pub last_duration_ms: i64,
}

/// In-process metrics sink. Keyed by a free-form `(job, source)` pair so the
/// same registry serves per-job counters (source = "") and per-source
/// counters within a job.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<DashMap<(String, String), Counters>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, job: &str, source: &str) {
        self.entry(job, source).requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, job: &str, source: &str, duration_ms: i64) {
        let counters = self.entry(job, source);
        counters.successes.fetch_add(1, Ordering::Relaxed);
        counters.last_duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    pub fn record_blocked(&self, job: &str, source: &str) {
        self.entry(job, source).blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_data(&self, job: &str, source: &str) {
        self.entry(job, source).no_data.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, job: &str, source: &str) {
        self.entry(job, source).failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, job: &str, source: &str) -> CounterSnapshot {
        let key = (job.to_string(), source.to_string());
        match self.counters.get(&key) {
            Some(c) => CounterSnapshot {
                requests: c.requests.load(Ordering::Relaxed),
                successes: c.successes.load(Ordering::Relaxed),
                blocked: c.blocked.load(Ordering::Relaxed),
                no_data: c.no_data.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
                last_duration_ms: c.last_duration_ms.load(Ordering::Relaxed),
            },
            None => CounterSnapshot {
                requests: 0,
                successes: 0,
                blocked: 0,
                no_data: 0,
                failures: 0,
                last_duration_ms: 0,
            },
        }
    }

    fn entry(&self, job: &str, source: &str) -> dashmap::mapref::one::Ref<'_, (String, String), Counters> {
        let key = (job.to_string(), source.to_string());
        self.counters.entry(key.clone()).or_default();
        self.counters.get(&key).expect("just inserted")
    }
}

/// A per-invocation logger handle, pre-bound with a job name and correlation id.
///
/// Grounded on the registry-of-named-handles idiom; generalized here from
/// service status to per-run correlation metadata.
#[derive(Debug, Clone)]
pub struct JobLogger {
    pub job_name: &'static str,
    pub run_id: Uuid,
    pub span: Span,
}

impl JobLogger {
    pub fn new(job_name: &'static str) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("job", job = job_name, run_id = %run_id);
        Self {
            job_name,
            run_id,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_key() {
        let registry = MetricsRegistry::new();
        registry.record_request("sync-odds", "oddschecker");
        registry.record_success("sync-odds", "oddschecker", 120);
        registry.record_request("sync-odds", "bet365");

        let snap = registry.snapshot("sync-odds", "oddschecker");
        assert_eq!(snap.requests, 1);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.last_duration_ms, 120);

        let other = registry.snapshot("sync-odds", "bet365");
        assert_eq!(other.requests, 1);
        assert_eq!(other.successes, 0);
    }

    #[test]
    fn status_registry_tracks_latest() {
        let registry = ServiceStatusRegistry::new();
        registry.set("scraper", ServiceStatus::Starting);
        registry.set("scraper", ServiceStatus::Active);
        assert_eq!(registry.get("scraper"), Some(ServiceStatus::Active));
        assert_eq!(registry.get("missing"), None);
    }
}
