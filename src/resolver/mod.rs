//! Team-name entity resolver (component F).
//!
//! Maps the raw home/away strings a source scrapes to a stored `Team`,
//! first via exact alias lookup, then via similarity against candidate
//! events in the same time window. Deliberately simpler than a multi-signal
//! weighted matcher: one normalized-Levenshtein threshold is sufficient
//! because candidates are already pre-filtered to a narrow kickoff window.

use chrono::{DateTime, Utc};

/// Minimum similarity (on both home and away names) for an automatic match.
pub const SIMILARITY_THRESHOLD: f64 = 0.75;

const DROPPED_SUFFIXES: &[&str] = &["fc", "sc", "city"];

/// A stored event considered a candidate match for a scraped odds row.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub event_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub scheduled_start: DateTime<Utc>,
}

/// Result of resolving one scraped (home, away) pair against candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMatch {
    Matched {
        event_id: i64,
        /// True when the matched team name differs from a stored alias,
        /// i.e. an alias write-back should be recorded.
        home_is_new_alias: bool,
        away_is_new_alias: bool,
    },
    NoMatch,
}

/// Looks up aliases and falls back to similarity scoring when nothing
/// matches exactly.
pub trait AliasLookup {
    /// Exact alias match for a normalized name, returning the canonical team name.
    fn lookup(&self, normalized: &str) -> Option<String>;
}

/// An `AliasLookup` backed by a map fetched up front for one sport, so a job
/// doesn't issue a query per scraped row while resolving a batch.
pub struct PreloadedAliases(pub std::collections::HashMap<String, String>);

impl AliasLookup for PreloadedAliases {
    fn lookup(&self, normalized: &str) -> Option<String> {
        self.0.get(normalized).cloned()
    }
}

/// Lowercase, strip punctuation, drop common club-name noise tokens, and
/// collapse whitespace so naming variants across sources converge.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let tokens: Vec<String> = stripped
        .split_whitespace()
        .filter(|tok| !DROPPED_SUFFIXES.contains(tok))
        .map(|tok| if tok == "united" { "utd".to_string() } else { tok.to_string() })
        .collect();

    tokens.join(" ")
}

/// Similarity in `[0.0, 1.0]`: `1 - levenshtein(a, b) / max(len(a), len(b))`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (strsim::levenshtein(a, b) as f64 / max_len as f64)
}

/// Resolve a scraped (home, away, start) triple against stored candidates.
///
/// Tries an exact alias match first; otherwise accepts the candidate with
/// the best `min(sim(home), sim(away))` above `SIMILARITY_THRESHOLD`,
/// breaking ties by the candidate whose scheduled start is closest to the
/// scraped kickoff time.
pub fn resolve(
    raw_home: &str,
    raw_away: &str,
    scraped_start: DateTime<Utc>,
    aliases: &impl AliasLookup,
    candidates: &[Candidate],
) -> ResolvedMatch {
    let norm_home = normalize(raw_home);
    let norm_away = normalize(raw_away);

    if let (Some(alias_home), Some(alias_away)) =
        (aliases.lookup(&norm_home), aliases.lookup(&norm_away))
    {
        if let Some(candidate) = candidates
            .iter()
            .find(|c| c.home_team == alias_home && c.away_team == alias_away)
        {
            return ResolvedMatch::Matched {
                event_id: candidate.event_id,
                home_is_new_alias: false,
                away_is_new_alias: false,
            };
        }
    }

    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        let home_sim = similarity(&norm_home, &normalize(&candidate.home_team));
        let away_sim = similarity(&norm_away, &normalize(&candidate.away_team));
        let score = home_sim.min(away_sim);
        if score < SIMILARITY_THRESHOLD {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_score)) if score > best_score => true,
            Some((best_candidate, best_score)) if score == best_score => {
                time_distance(candidate.scheduled_start, scraped_start)
                    < time_distance(best_candidate.scheduled_start, scraped_start)
            }
            _ => false,
        };
        if better {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, _)) => ResolvedMatch::Matched {
            event_id: candidate.event_id,
            home_is_new_alias: aliases.lookup(&norm_home).is_none(),
            away_is_new_alias: aliases.lookup(&norm_away).is_none(),
        },
        None => ResolvedMatch::NoMatch,
    }
}

fn time_distance(a: DateTime<Utc>, b: DateTime<Utc>) -> chrono::Duration {
    (a - b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapAliases(HashMap<String, String>);
    impl AliasLookup for MapAliases {
        fn lookup(&self, normalized: &str) -> Option<String> {
            self.0.get(normalized).cloned()
        }
    }

    fn candidate(id: i64, home: &str, away: &str, start: DateTime<Utc>) -> Candidate {
        Candidate {
            event_id: id,
            home_team: home.to_string(),
            away_team: away.to_string(),
            scheduled_start: start,
        }
    }

    #[test]
    fn normalize_drops_suffix_and_rewrites_united() {
        assert_eq!(normalize("Manchester United FC"), "manchester utd");
        assert_eq!(normalize("Leicester City"), "leicester");
    }

    #[test]
    fn exact_alias_match_wins_without_fuzzy_scoring() {
        let mut map = HashMap::new();
        map.insert(normalize("Man Utd"), "Manchester United".to_string());
        map.insert(normalize("Chelsea FC"), "Chelsea".to_string());
        let aliases = MapAliases(map);
        let start = Utc::now();
        let candidates = vec![candidate(1, "Manchester United", "Chelsea", start)];

        let result = resolve("Man Utd", "Chelsea FC", start, &aliases, &candidates);
        assert_eq!(
            result,
            ResolvedMatch::Matched {
                event_id: 1,
                home_is_new_alias: false,
                away_is_new_alias: false
            }
        );
    }

    #[test]
    fn fuzzy_match_accepts_above_threshold() {
        let aliases = MapAliases(HashMap::new());
        let start = Utc::now();
        let candidates = vec![candidate(2, "Liverpool", "Everton", start)];
        let result = resolve("Liverpoool", "Everton", start, &aliases, &candidates);
        assert!(matches!(result, ResolvedMatch::Matched { event_id: 2, .. }));
    }

    #[test]
    fn dissimilar_names_produce_no_match() {
        let aliases = MapAliases(HashMap::new());
        let start = Utc::now();
        let candidates = vec![candidate(3, "Arsenal", "Tottenham", start)];
        let result = resolve("Real Madrid", "Barcelona", start, &aliases, &candidates);
        assert_eq!(result, ResolvedMatch::NoMatch);
    }

    #[test]
    fn ties_broken_by_closest_start_time() {
        let aliases = MapAliases(HashMap::new());
        let scraped_start = Utc::now();
        let near = scraped_start + chrono::Duration::minutes(5);
        let far = scraped_start + chrono::Duration::hours(5);
        let candidates = vec![
            candidate(10, "Fulham", "Brentford", far),
            candidate(11, "Fulham", "Brentford", near),
        ];
        let result = resolve("Fulham", "Brentford", scraped_start, &aliases, &candidates);
        assert!(matches!(result, ResolvedMatch::Matched { event_id: 11, .. }));
    }
}
