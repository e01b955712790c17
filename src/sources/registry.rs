//! Ordered collection of configured odds sources.

use std::sync::Arc;

use super::OddsSource;

/// Holds every configured source, sorted by descending priority once at
/// startup so jobs can simply iterate in order.
pub struct SourceRegistry {
    sources: Vec<Arc<dyn OddsSource>>,
}

impl SourceRegistry {
    /// Sorted ascending by priority — lower numbers are preferred and are
    /// iterated first, per spec.md §4.E.
    pub fn new(mut sources: Vec<Arc<dyn OddsSource>>) -> Self {
        sources.sort_by(|a, b| a.priority().cmp(&b.priority()));
        Self { sources }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn OddsSource>> {
        self.sources.iter().filter(|s| s.enabled())
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn OddsSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserPool;
    use crate::sources::{NormalizedOdds, OddsSource, ScrapeOutcome};
    use async_trait::async_trait;
    use chromiumoxide::Page;

    struct FakeSource {
        name: &'static str,
        priority: u32,
    }

    #[async_trait]
    impl OddsSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }
        fn domain(&self) -> &str {
            "example.test"
        }
        fn enabled(&self) -> bool {
            true
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        fn cooldown_minutes(&self) -> u32 {
            5
        }
        fn sport_urls(&self, _sport: &str) -> Vec<String> {
            vec![]
        }
        async fn scrape(
            &self,
            _pool: &BrowserPool,
            _page: &mut Option<Page>,
            _sport: &str,
        ) -> ScrapeOutcome {
            Ok(Vec::<NormalizedOdds>::new())
        }
    }

    #[test]
    fn sources_iterate_lowest_priority_number_first() {
        let registry = SourceRegistry::new(vec![
            Arc::new(FakeSource { name: "low-pref", priority: 10 }),
            Arc::new(FakeSource { name: "high-pref", priority: 1 }),
        ]);
        let names: Vec<&str> = registry.enabled().map(|s| s.name()).collect();
        assert_eq!(names, vec!["high-pref", "low-pref"]);
    }
}
