//! Urgency-weighted adaptive timer for `sync-odds` (component H).
//!
//! Classifies how close the next scheduled event is, picks a base delay
//! range by urgency, scales it for time-of-day, and adds jitter. Pure
//! functions over a `Utc` instant and an injectable timezone so the
//! off-peak multiplier is unit-testable across DST boundaries.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::time::Duration;

/// How close the nearest scheduled event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// A scheduled event starts within 2 hours.
    Imminent,
    /// Within 6 hours.
    Soon,
    /// Within 24 hours.
    Later,
    /// Nothing scheduled within 24 hours.
    None,
}

impl Urgency {
    /// Classify from the minimum time-to-kickoff among scheduled events.
    pub fn classify(min_time_to_kickoff: Option<ChronoDuration>) -> Self {
        match min_time_to_kickoff {
            Some(d) if d <= ChronoDuration::hours(2) => Urgency::Imminent,
            Some(d) if d <= ChronoDuration::hours(6) => Urgency::Soon,
            Some(d) if d <= ChronoDuration::hours(24) => Urgency::Later,
            _ => Urgency::None,
        }
    }

    fn base_range(self) -> (Duration, Duration) {
        match self {
            Urgency::Imminent => (Duration::from_secs(45 * 60), Duration::from_secs(75 * 60)),
            Urgency::Soon => (Duration::from_secs(60 * 60), Duration::from_secs(90 * 60)),
            Urgency::Later => (Duration::from_secs(90 * 60), Duration::from_secs(150 * 60)),
            Urgency::None => (Duration::from_secs(4 * 3600), Duration::from_secs(6 * 3600)),
        }
    }

    /// Floor below which the computed delay is never clamped, regardless of
    /// off-peak multiplier or negative jitter.
    fn minimum(self) -> Duration {
        match self {
            Urgency::Imminent => Duration::from_secs(30 * 60),
            Urgency::Soon => Duration::from_secs(45 * 60),
            Urgency::Later => Duration::from_secs(60 * 60),
            Urgency::None => Duration::from_secs(3 * 3600),
        }
    }
}

const JITTER_MINUTES: i64 = 10;

/// Off-peak multiplier for the local hour in `tz`, per spec §4.H:
/// ×1.5 for 00:00–06:00, ×1.3 for 22:00–01:00, ×1.2 for 06:00–09:00, else ×1.0.
fn off_peak_factor(now_utc: DateTime<Utc>, tz: Tz) -> f64 {
    let hour = now_utc.with_timezone(&tz).hour();
    match hour {
        0..=5 => 1.5,
        22 | 23 => 1.3,
        6..=8 => 1.2,
        _ => 1.0,
    }
}

/// Compute the next delay before the following `sync-odds` fire.
///
/// Draws a uniform sample from the urgency's base range, applies the
/// off-peak multiplier for `now_utc` in `tz`, adds uniform jitter in
/// ±`JITTER_MINUTES`, then clamps below at the urgency's minimum.
pub fn next_delay(urgency: Urgency, now_utc: DateTime<Utc>, tz: Tz) -> Duration {
    let (min, max) = urgency.base_range();
    let base_secs = {
        let mut rng = rand::rng();
        rng.random_range(min.as_secs_f64()..=max.as_secs_f64())
    };

    let scaled_secs = base_secs * off_peak_factor(now_utc, tz);

    let jitter_secs = {
        let mut rng = rand::rng();
        rng.random_range(-(JITTER_MINUTES * 60) as f64..=(JITTER_MINUTES * 60) as f64)
    };

    let total_secs = (scaled_secs + jitter_secs).max(0.0);
    Duration::from_secs_f64(total_secs).max(urgency.minimum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn classifies_imminent_within_two_hours() {
        assert_eq!(Urgency::classify(Some(ChronoDuration::minutes(75))), Urgency::Imminent);
    }

    #[test]
    fn classifies_soon_within_six_hours() {
        assert_eq!(Urgency::classify(Some(ChronoDuration::hours(5))), Urgency::Soon);
    }

    #[test]
    fn classifies_later_within_a_day() {
        assert_eq!(Urgency::classify(Some(ChronoDuration::hours(20))), Urgency::Later);
    }

    #[test]
    fn classifies_none_beyond_a_day_or_absent() {
        assert_eq!(Urgency::classify(Some(ChronoDuration::hours(48))), Urgency::None);
        assert_eq!(Urgency::classify(None), Urgency::None);
    }

    #[test]
    fn imminent_delay_never_drops_below_thirty_minutes() {
        let london = chrono_tz::Europe::London;
        let noon = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        for _ in 0..200 {
            let delay = next_delay(Urgency::Imminent, noon, london);
            assert!(delay >= Duration::from_secs(30 * 60), "delay {delay:?} below floor");
        }
    }

    #[test]
    fn none_urgency_delay_never_drops_below_three_hours() {
        let london = chrono_tz::Europe::London;
        let noon = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        for _ in 0..200 {
            let delay = next_delay(Urgency::None, noon, london);
            assert!(delay >= Duration::from_secs(3 * 3600), "delay {delay:?} below floor");
        }
    }

    #[test]
    fn off_peak_factor_matches_spec_table() {
        let london = chrono_tz::Europe::London;
        let at = |h: u32| Utc.with_ymd_and_hms(2026, 1, 15, h, 0, 0).unwrap();
        assert_eq!(off_peak_factor(at(3), london), 1.5);
        assert_eq!(off_peak_factor(at(23), london), 1.3);
        assert_eq!(off_peak_factor(at(7), london), 1.2);
        assert_eq!(off_peak_factor(at(14), london), 1.0);
    }
}
