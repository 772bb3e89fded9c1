//! Cross-call failure tracking and circuit-breaker backoff.
//!
//! One failure record per `(language, namespace)` key. Once a key has failed
//! `backoff_threshold` times in a row, calls inside the backoff window are
//! short-circuited to an empty bundle instead of hammering a resource that is
//! known to be failing. Any success clears the record entirely.

use crate::cache::CacheKey;
use crate::clock::Clock;
use crate::config::LoaderConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct FailureRecord {
    count: u32,
    last_attempt: Instant,
}

pub struct FailureTracker {
    clock: Arc<dyn Clock>,
    threshold: u32,
    base_window: Duration,
    max_window: Duration,
    records: Mutex<HashMap<CacheKey, FailureRecord>>,
}

impl FailureTracker {
    pub fn new(clock: Arc<dyn Clock>, config: &LoaderConfig) -> Self {
        Self {
            clock,
            threshold: config.backoff_threshold,
            base_window: config.backoff_base,
            max_window: config.backoff_max,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed load attempt for the key.
    pub fn record_failure(&self, key: &CacheKey) {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        let record = records.entry(key.clone()).or_insert(FailureRecord {
            count: 0,
            last_attempt: now,
        });
        record.count += 1;
        record.last_attempt = now;
        debug!("{}: failure recorded (count={})", key, record.count);
    }

    /// Clear the failure record for the key after any success.
    pub fn record_success(&self, key: &CacheKey) {
        self.records.lock().unwrap().remove(key);
    }

    /// Whether a load for the key should be skipped under the backoff policy.
    ///
    /// True when the failure count has reached the threshold and the last
    /// attempt was within the current backoff window.
    pub fn should_skip(&self, key: &CacheKey) -> bool {
        let records = self.records.lock().unwrap();
        let Some(record) = records.get(key) else {
            return false;
        };
        if record.count < self.threshold {
            return false;
        }

        let window = self.backoff_window(record.count);
        let elapsed = self.clock.now().saturating_duration_since(record.last_attempt);
        elapsed < window
    }

    /// Current consecutive-failure count for the key.
    pub fn failure_count(&self, key: &CacheKey) -> u32 {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    /// Backoff window for a given failure count: doubles for each failure
    /// past the threshold, capped at `max_window`.
    fn backoff_window(&self, count: u32) -> Duration {
        let exponent = count.saturating_sub(self.threshold).min(16);
        self.base_window
            .saturating_mul(1u32 << exponent)
            .min(self.max_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::language::Language;

    fn tracker_with_clock() -> (Arc<ManualClock>, FailureTracker) {
        let clock = Arc::new(ManualClock::new());
        let tracker = FailureTracker::new(clock.clone(), &LoaderConfig::default());
        (clock, tracker)
    }

    fn key() -> CacheKey {
        CacheKey::new(Language::ARABIC, "products")
    }

    // ==================== Threshold Tests ====================

    #[test]
    fn test_no_failures_no_skip() {
        let (_clock, tracker) = tracker_with_clock();
        assert!(!tracker.should_skip(&key()));
    }

    #[test]
    fn test_below_threshold_no_skip() {
        let (_clock, tracker) = tracker_with_clock();

        tracker.record_failure(&key());
        tracker.record_failure(&key());

        assert_eq!(tracker.failure_count(&key()), 2);
        assert!(!tracker.should_skip(&key()));
    }

    #[test]
    fn test_at_threshold_skips_within_window() {
        let (_clock, tracker) = tracker_with_clock();

        for _ in 0..3 {
            tracker.record_failure(&key());
        }

        assert!(tracker.should_skip(&key()));
    }

    // ==================== Window Tests ====================

    #[test]
    fn test_skip_clears_after_base_window() {
        let (clock, tracker) = tracker_with_clock();

        for _ in 0..3 {
            tracker.record_failure(&key());
        }
        assert!(tracker.should_skip(&key()));

        // count == threshold: window is the 60s base
        clock.advance(Duration::from_secs(59));
        assert!(tracker.should_skip(&key()));

        clock.advance(Duration::from_secs(2));
        assert!(!tracker.should_skip(&key()));
    }

    #[test]
    fn test_window_doubles_past_threshold() {
        let (clock, tracker) = tracker_with_clock();

        // count == 4: window is 120s
        for _ in 0..4 {
            tracker.record_failure(&key());
        }

        clock.advance(Duration::from_secs(90));
        assert!(tracker.should_skip(&key()));

        clock.advance(Duration::from_secs(31));
        assert!(!tracker.should_skip(&key()));
    }

    #[test]
    fn test_window_caps_at_max() {
        let (clock, tracker) = tracker_with_clock();

        // count == 10 would be 60s * 2^7 uncapped; the cap holds it at 300s
        for _ in 0..10 {
            tracker.record_failure(&key());
        }

        clock.advance(Duration::from_secs(299));
        assert!(tracker.should_skip(&key()));

        clock.advance(Duration::from_secs(2));
        assert!(!tracker.should_skip(&key()));
    }

    // ==================== Success Tests ====================

    #[test]
    fn test_success_clears_record_entirely() {
        let (_clock, tracker) = tracker_with_clock();

        for _ in 0..5 {
            tracker.record_failure(&key());
        }
        assert!(tracker.should_skip(&key()));

        tracker.record_success(&key());

        assert_eq!(tracker.failure_count(&key()), 0);
        assert!(!tracker.should_skip(&key()));
    }

    #[test]
    fn test_keys_are_independent() {
        let (_clock, tracker) = tracker_with_clock();
        let other = CacheKey::new(Language::ENGLISH, "products");

        for _ in 0..3 {
            tracker.record_failure(&key());
        }

        assert!(tracker.should_skip(&key()));
        assert!(!tracker.should_skip(&other));
    }

    #[test]
    fn test_success_on_unknown_key_is_noop() {
        let (_clock, tracker) = tracker_with_clock();
        tracker.record_success(&key());
        assert_eq!(tracker.failure_count(&key()), 0);
    }
}
