//! Rate-limit detector (component C).
//!
//! Per-domain token/cooldown bookkeeping; widens delays on block signals.
//! A `governor` token bucket enforces the jittered minimum spacing; an
//! explicit cooldown field (driven by application-level failure signals,
//! which governor has no notion of) implements the exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, NotKeyed}};
use rand::Rng;
use tracing::debug;

/// Default minimum spacing between requests to the same domain.
const DEFAULT_MIN_SPACING: Duration = Duration::from_secs(3);
/// Jitter applied to the minimum spacing, as a fraction of the spacing.
const JITTER_FRACTION: f64 = 0.30;
/// Cooldown floor after a failure.
const COOLDOWN_FLOOR: Duration = Duration::from_secs(60);
/// Cooldown ceiling after repeated failures.
const COOLDOWN_CEILING: Duration = Duration::from_secs(30 * 60);

struct DomainState {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    failure_streak: u32,
    cooldown_until: Option<Instant>,
}

impl DomainState {
    fn new(min_spacing: Duration) -> Self {
        let quota = Quota::with_period(min_spacing).expect("min_spacing must be non-zero");
        Self {
            limiter: RateLimiter::direct(quota),
            failure_streak: 0,
            cooldown_until: None,
        }
    }
}

/// Per-domain rate-limit and bot-detection cooldown tracker.
pub struct RateLimitDetector {
    min_spacing: Duration,
    domains: DashMap<String, DomainState>,
}

impl RateLimitDetector {
    pub fn new() -> Self {
        Self::with_min_spacing(DEFAULT_MIN_SPACING)
    }

    pub fn with_min_spacing(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            domains: DashMap::new(),
        }
    }

    /// Sleep until `cooldown_until` has passed and the jittered minimum
    /// spacing token bucket has a slot available.
    pub async fn wait(&self, domain: &str) {
        let cooldown_until = {
            let entry = self
                .domains
                .entry(domain.to_string())
                .or_insert_with(|| DomainState::new(self.min_spacing));
            entry.cooldown_until
        };

        if let Some(until) = cooldown_until {
            let now = Instant::now();
            if until > now {
                tokio::time::sleep(until - now).await;
            }
        }

        // Jittered minimum spacing on top of the cooldown wait.
        let jitter_ms = {
            let mut rng = rand::rng();
            let span = (self.min_spacing.as_millis() as f64 * JITTER_FRACTION) as i64;
            rng.random_range(-span..=span)
        };
        if jitter_ms > 0 {
            tokio::time::sleep(Duration::from_millis(jitter_ms as u64)).await;
        }

        if let Some(state) = self.domains.get(domain) {
            state.limiter.until_ready().await;
        }
    }

    /// Clear the failure streak and halve any remaining cooldown toward baseline.
    pub fn record_success(&self, domain: &str) {
        if let Some(mut state) = self.domains.get_mut(domain) {
            state.failure_streak = 0;
            state.cooldown_until = state.cooldown_until.map(|until| {
                let now = Instant::now();
                if until <= now {
                    return until;
                }
                let remaining = until - now;
                now + remaining / 2
            });
        }
    }

    /// Apply exponential cooldown `base * 2^streak`, clamped to
    /// `[COOLDOWN_FLOOR, COOLDOWN_CEILING]`.
    pub fn record_failure(&self, domain: &str) {
        let mut entry = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState::new(self.min_spacing));
        entry.failure_streak += 1;
        let cooldown = cooldown_for_streak(entry.failure_streak);
        entry.cooldown_until = Some(Instant::now() + cooldown);
        debug!(domain, streak = entry.failure_streak, cooldown = ?cooldown, "rate limit cooldown extended");
    }

    /// Whether `domain` is currently inside its cooldown window.
    pub fn is_cooling_down(&self, domain: &str) -> bool {
        self.domains
            .get(domain)
            .and_then(|state| state.cooldown_until)
            .is_some_and(|until| Instant::now() < until)
    }
}

impl Default for RateLimitDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn cooldown_for_streak(streak: u32) -> Duration {
    let base = COOLDOWN_FLOOR.as_secs_f64();
    let scaled = base * 2f64.powi(streak as i32 - 1).max(1.0);
    Duration::from_secs_f64(scaled.clamp(COOLDOWN_FLOOR.as_secs_f64(), COOLDOWN_CEILING.as_secs_f64()))
}

pub type SharedRateLimitDetector = Arc<RateLimitDetector>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_clamped_to_floor_and_ceiling() {
        assert_eq!(cooldown_for_streak(1), COOLDOWN_FLOOR);
        assert!(cooldown_for_streak(10) <= COOLDOWN_CEILING);
        assert_eq!(cooldown_for_streak(20), COOLDOWN_CEILING);
    }

    #[test]
    fn cooldown_grows_with_streak() {
        assert!(cooldown_for_streak(3) > cooldown_for_streak(1));
    }

    #[test]
    fn record_failure_sets_cooling_down() {
        let detector = RateLimitDetector::new();
        assert!(!detector.is_cooling_down("example.com"));
        detector.record_failure("example.com");
        assert!(detector.is_cooling_down("example.com"));
    }

    #[test]
    fn record_success_clears_streak() {
        let detector = RateLimitDetector::new();
        detector.record_failure("example.com");
        detector.record_success("example.com");
        let state = detector.domains.get("example.com").unwrap();
        assert_eq!(state.failure_streak, 0);
    }

    #[tokio::test]
    async fn wait_returns_when_no_cooldown_configured() {
        let detector = RateLimitDetector::with_min_spacing(Duration::from_millis(1));
        tokio::time::timeout(Duration::from_secs(1), detector.wait("example.com"))
            .await
            .expect("wait should not block indefinitely");
    }
}
