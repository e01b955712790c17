//! Top-level error types for the scraper core.
//!
//! Component-local errors (`ScrapeError`, `ResolverError`) are precise
//! `thiserror` enums; job and application code propagates them as
//! `anyhow::Error` via `?`.

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Errors raised while scraping a single source.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },

    #[error("transient network error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("source reported no data available")]
    NoDataAvailable,

    #[error("source appears to be bot-blocked: {reason}")]
    BotBlocked { reason: String },

    #[error("browser error: {0}")]
    Browser(#[source] anyhow::Error),
}

/// Errors raised while resolving a scraped team pair to a stored event.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("no candidate event matched home={home:?} away={away:?}")]
    NoMatch { home: String, away: String },
}

/// Errors raised by the proxy rotator.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no proxy providers configured")]
    Disabled,
}

/// Errors surfaced by the browser pool.
#[derive(Debug, thiserror::Error)]
pub enum BrowserPoolError {
    #[error("failed to launch browser after {attempts} attempts: {source}")]
    LaunchFailed {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("context lease timed out")]
    LeaseTimeout,
}
