//! Bounded last-access timestamps per resource.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Resources remembered at most.
pub const RECENCY_CAPACITY: usize = 20;

/// Age after which an access no longer boosts ranking.
#[must_use]
pub fn recency_horizon() -> Duration {
    Duration::hours(1)
}

/// Last-access time per resource identity, evicting the oldest entry when
/// full.
#[derive(Debug, Clone)]
pub struct RecencyMap {
    entries: HashMap<String, DateTime<Utc>>,
    capacity: usize,
}

impl Default for RecencyMap {
    fn default() -> Self {
        Self::new(RECENCY_CAPACITY)
    }
}

impl RecencyMap {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    /// Record an access to `uri` at `at`.
    pub fn record(&mut self, uri: &str, at: DateTime<Utc>) {
        self.entries.insert(uri.to_string(), at);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(uri, _)| uri.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<DateTime<Utc>> {
        self.entries.get(uri).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Linear decay from 1 at the moment of access to 0 at the horizon.
///
/// Accesses stamped in the future count as current.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recency_factor(accessed: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_ms = (now - accessed).num_milliseconds().max(0) as f64;
    let horizon_ms = recency_horizon().num_milliseconds() as f64;
    (1.0 - age_ms / horizon_ms).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(minutes_ago)
    }

    #[test]
    fn test_factor_decays_linearly() {
        let now = Utc::now();
        assert!((recency_factor(now, now) - 1.0).abs() < 1e-9);
        assert!((recency_factor(at(30, now), now) - 0.5).abs() < 1e-9);
        assert!((recency_factor(at(10, now), now) - 50.0 / 60.0).abs() < 1e-9);
        assert!(recency_factor(at(60, now), now).abs() < 1e-9);
        assert!(recency_factor(at(240, now), now).abs() < 1e-9);
        assert!((recency_factor(now + Duration::minutes(5), now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_factor_strictly_decreasing_within_horizon() {
        let now = Utc::now();
        let factors: Vec<f64> = (0..60).step_by(5).map(|m| recency_factor(at(m, now), now)).collect();
        assert!(factors.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let now = Utc::now();
        let mut map = RecencyMap::default();
        for i in 0..RECENCY_CAPACITY {
            map.record(&format!("file:///ws/{i}.rs"), at(i64::try_from(100 - i).unwrap(), now));
        }
        assert_eq!(map.len(), RECENCY_CAPACITY);

        map.record("file:///ws/new.rs", now);
        assert_eq!(map.len(), RECENCY_CAPACITY);
        // Entry 0 was stamped furthest in the past
        assert!(map.get("file:///ws/0.rs").is_none());
        assert!(map.get("file:///ws/1.rs").is_some());
        assert_eq!(map.get("file:///ws/new.rs"), Some(now));
    }

    #[test]
    fn test_rerecord_updates_timestamp() {
        let now = Utc::now();
        let mut map = RecencyMap::new(2);
        map.record("a", at(30, now));
        map.record("b", at(20, now));
        map.record("a", now);
        map.record("c", at(10, now));

        assert!(map.get("b").is_none());
        assert_eq!(map.get("a"), Some(now));
        assert_eq!(map.len(), 2);
    }
}
