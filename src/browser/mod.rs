//! Headless browser pool (component D).
//!
//! Keeps a small number of long-lived `chromiumoxide` browser instances
//! alive, recycling them on age/usage/failure thresholds rather than
//! launching a fresh browser per job. Each instance pairs a `Browser` handle
//! with the tokio task driving its CDP event loop.

pub mod stealth;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::BrowserPoolError;
use crate::proxy::SharedProxyRotator;
use stealth::StealthProfile;

const MAX_AGE: Duration = Duration::from_secs(30 * 60);
const MAX_REQUESTS: u64 = 150;
const MAX_FAILURES: u64 = 5;
const GLOBAL_ROTATION_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
const LAUNCH_ATTEMPTS: u32 = 3;

struct ManagedContext {
    browser: Browser,
    handler: JoinHandle<()>,
    created_at: Instant,
    last_used_at: Mutex<Instant>,
    request_count: AtomicU64,
    failure_count: AtomicU64,
    proxy_url: Option<String>,
}

impl ManagedContext {
    fn needs_recycle(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > MAX_AGE
            || self.request_count.load(Ordering::Relaxed) > MAX_REQUESTS
            || self.failure_count.load(Ordering::Relaxed) >= MAX_FAILURES
    }

    async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "error closing browser context");
        }
        self.handler.abort();
    }
}

/// Point-in-time snapshot of one context, exposed over the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct ContextStats {
    pub age_secs: u64,
    pub request_count: u64,
    pub failure_count: u64,
    pub proxy_url: Option<String>,
}

/// Options influencing how `execute` drives a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Add small randomized delays/mouse movement between actions.
    pub humanize: bool,
}

/// A bounded pool of headless browser contexts with stealth and recycling.
pub struct BrowserPool {
    contexts: Mutex<Vec<ManagedContext>>,
    max_contexts: usize,
    proxy_rotator: Option<SharedProxyRotator>,
    last_global_rotation: Mutex<Instant>,
}

impl BrowserPool {
    pub fn new(max_contexts: usize, proxy_rotator: Option<SharedProxyRotator>) -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            max_contexts: max_contexts.min(3),
            proxy_rotator,
            last_global_rotation: Mutex::new(Instant::now()),
        }
    }

    /// Borrow a page from an existing or freshly launched context, run `f`
    /// against it, and return the context to the pool afterward.
    pub async fn execute<F, Fut, T>(&self, _opts: ExecuteOptions, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(Page) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        self.maybe_rotate_globally().await;

        let mut contexts = self.contexts.lock().await;
        let now = Instant::now();
        if let Some(idx) = contexts.iter().position(|c| c.needs_recycle(now)) {
            let stale = contexts.remove(idx);
            drop(contexts);
            stale.close().await;
            contexts = self.contexts.lock().await;
        }

        if contexts.is_empty() && contexts.len() < self.max_contexts {
            let ctx = self.launch_context().await?;
            contexts.push(ctx);
        } else if contexts.len() < self.max_contexts {
            // Prefer launching a fresh context up to the cap rather than
            // contending on a single busy one.
            let ctx = self.launch_context().await?;
            contexts.push(ctx);
        }

        let context = contexts
            .last()
            .ok_or(BrowserPoolError::LeaseTimeout)
            .map_err(anyhow::Error::from)?;

        let page = context.browser.new_page("about:blank").await?;
        *context.last_used_at.lock().await = Instant::now();
        context.request_count.fetch_add(1, Ordering::Relaxed);
        drop(contexts);

        match f(page).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let contexts = self.contexts.lock().await;
                if let Some(context) = contexts.last() {
                    context.failure_count.fetch_add(1, Ordering::Relaxed);
                }
                Err(err)
            }
        }
    }

    /// Lease a page directly; caller is responsible for closing it.
    pub async fn lease_page(&self) -> anyhow::Result<Page> {
        let mut contexts = self.contexts.lock().await;
        if contexts.is_empty() {
            let ctx = self.launch_context().await?;
            contexts.push(ctx);
        }
        let context = contexts.last().ok_or(BrowserPoolError::LeaseTimeout)?;
        let page = context.browser.new_page("about:blank").await?;
        context.request_count.fetch_add(1, Ordering::Relaxed);
        Ok(page)
    }

    /// Force-close every context, regardless of recycle thresholds.
    pub async fn recycle_all(&self, reason: &str) {
        let mut contexts = self.contexts.lock().await;
        let closing = std::mem::take(&mut *contexts);
        drop(contexts);
        info!(reason, count = closing.len(), "recycling all browser contexts");
        for ctx in closing {
            ctx.close().await;
        }
        *self.last_global_rotation.lock().await = Instant::now();
    }

    pub async fn stats(&self) -> Vec<ContextStats> {
        let contexts = self.contexts.lock().await;
        let now = Instant::now();
        contexts
            .iter()
            .map(|c| ContextStats {
                age_secs: now.duration_since(c.created_at).as_secs(),
                request_count: c.request_count.load(Ordering::Relaxed),
                failure_count: c.failure_count.load(Ordering::Relaxed),
                proxy_url: c.proxy_url.clone(),
            })
            .collect()
    }

    async fn maybe_rotate_globally(&self) {
        let last = *self.last_global_rotation.lock().await;
        if Instant::now().duration_since(last) > GLOBAL_ROTATION_INTERVAL {
            self.recycle_all("six-hourly rotation").await;
        }
    }

    async fn launch_context(&self) -> anyhow::Result<ManagedContext> {
        let profile = StealthProfile::random();
        let proxy = self.proxy_rotator.as_ref().and_then(|r| r.select());

        let mut last_err = None;
        for attempt in 1..=LAUNCH_ATTEMPTS {
            let mut builder = BrowserConfig::builder()
                .window_size(profile.viewport.0, profile.viewport.1)
                .arg("--disable-blink-features=AutomationControlled");
            if let Some(proxy) = &proxy {
                builder = builder.arg(format!("--proxy-server={}", proxy.url));
            }
            let config = match builder.build() {
                Ok(c) => c,
                Err(err) => {
                    last_err = Some(anyhow::anyhow!(err));
                    continue;
                }
            };

            match Browser::launch(config).await {
                Ok((browser, mut handler)) => {
                    let handle = tokio::spawn(async move {
                        while let Some(event) = handler.next().await {
                            if let Err(err) = event {
                                warn!(error = %err, "browser handler event error");
                            }
                        }
                    });
                    if let Err(err) = browser.execute(
                        chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams::new(
                            profile.init_script(),
                        ),
                    ).await {
                        warn!(error = %err, "failed to install stealth init script");
                    }
                    return Ok(ManagedContext {
                        browser,
                        handler: handle,
                        created_at: Instant::now(),
                        last_used_at: Mutex::new(Instant::now()),
                        request_count: AtomicU64::new(0),
                        failure_count: AtomicU64::new(0),
                        proxy_url: proxy.as_ref().map(|p| p.url.clone()),
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "browser launch attempt failed");
                    last_err = Some(anyhow::anyhow!(err));
                }
            }
        }

        Err(BrowserPoolError::LaunchFailed {
            attempts: LAUNCH_ATTEMPTS,
            source: last_err.unwrap_or_else(|| anyhow::anyhow!("unknown launch failure")),
        }
        .into())
    }
}

pub type SharedBrowserPool = Arc<BrowserPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_caps_max_contexts_at_three() {
        let pool = BrowserPool::new(10, None);
        assert_eq!(pool.max_contexts, 3);
    }
}
