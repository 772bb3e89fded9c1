//! In-flight request tracking and deduplication.
//!
//! At most one load operation runs per `(language, namespace)` key at any
//! instant: concurrent callers join the existing shared future instead of
//! starting a second fetch. The underlying operation is spawned as a task so
//! it runs to completion (and populates the cache) even if every waiter gives
//! up, and the tracker entry is removed when the operation settles regardless
//! of outcome.
//!
//! A periodic sweep evicts entries older than a time budget so a hung load
//! cannot wedge the tracker forever. The sweep does not cancel the underlying
//! task; it only stops the tracker from reporting "in progress" past a
//! reasonable bound, which means a later call may start a second fetch while
//! the first is still running. Cache writes are idempotent overwrites, so the
//! race is harmless.

use crate::cache::CacheKey;
use crate::clock::Clock;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

type SharedLoad<T> = Shared<BoxFuture<'static, T>>;

struct Entry<T: Clone> {
    started: Instant,
    future: SharedLoad<T>,
}

pub struct InFlightTracker<T: Clone> {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, Entry<T>>>,
}

impl<T> InFlightTracker<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Join an existing in-flight load for the key, or start a new one.
    ///
    /// `start` is only invoked when no entry exists. The returned shared
    /// future can be awaited by any number of callers; the tracker entry is
    /// removed once the operation settles. If the operation panics, waiters
    /// receive `T::default()` rather than a propagated panic.
    pub fn begin_or_join<F>(self: &Arc<Self>, key: CacheKey, start: F) -> SharedLoad<T>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut entries = self.entries.lock().unwrap();

        if let Some(entry) = entries.get(&key) {
            debug!("{}: joining in-flight load", key);
            return entry.future.clone();
        }

        let tracker = Arc::downgrade(self);
        let task_key = key.clone();
        let inner = start();

        // Spawned so the load completes even if all waiters drop.
        let handle: JoinHandle<T> = tokio::spawn(async move {
            let value = inner.await;
            if let Some(tracker) = tracker.upgrade() {
                tracker.remove(&task_key);
            }
            value
        });

        let wait_key = key.clone();
        let future: BoxFuture<'static, T> = async move {
            match handle.await {
                Ok(value) => value,
                Err(e) => {
                    error!("{}: in-flight load task failed: {}", wait_key, e);
                    T::default()
                }
            }
        }
        .boxed();

        let shared = future.shared();
        entries.insert(
            key,
            Entry {
                started: self.clock.now(),
                future: shared.clone(),
            },
        );
        shared
    }

    /// Remove the entry for a key, if present.
    pub fn remove(&self, key: &CacheKey) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Evict entries older than `max_age`. Returns how many were removed.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, entry| {
            let age = now.saturating_duration_since(entry.started);
            if age >= max_age {
                warn!("{}: evicting stuck in-flight entry (age {:?})", key, age);
                false
            } else {
                true
            }
        });
        before - entries.len()
    }

    /// Number of loads currently tracked as in flight.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the periodic stuck-entry sweep.
    ///
    /// Runs for as long as the tracker is alive; the task exits on its own
    /// once every other handle to the tracker has been dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration, max_age: Duration) -> JoinHandle<()> {
        let tracker = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(tracker) = tracker.upgrade() else {
                    break;
                };
                tracker.evict_older_than(max_age);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::language::Language;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(namespace: &str) -> CacheKey {
        CacheKey::new(Language::ENGLISH, namespace)
    }

    fn tracker() -> (Arc<ManualClock>, Arc<InFlightTracker<u32>>) {
        let clock = Arc::new(ManualClock::new());
        (clock.clone(), Arc::new(InFlightTracker::new(clock)))
    }

    // ==================== Deduplication Tests ====================

    #[tokio::test]
    async fn test_second_caller_joins_existing_load() {
        let (_clock, tracker) = tracker();
        let starts = Arc::new(AtomicU32::new(0));

        let make = |starts: Arc<AtomicU32>| {
            move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    42u32
                }
                .boxed()
            }
        };

        let first = tracker.begin_or_join(key("common"), make(starts.clone()));
        let second = tracker.begin_or_join(key("common"), make(starts.clone()));

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, 42);
        assert_eq!(b, 42);
        assert_eq!(starts.load(Ordering::SeqCst), 1, "only one load should start");
    }

    #[tokio::test]
    async fn test_distinct_keys_load_independently() {
        let (_clock, tracker) = tracker();
        let starts = Arc::new(AtomicU32::new(0));

        for namespace in ["common", "products"] {
            let starts = starts.clone();
            let fut = tracker.begin_or_join(key(namespace), move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async move { 1u32 }.boxed()
            });
            fut.await;
        }

        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    // ==================== Lifecycle Tests ====================

    #[tokio::test]
    async fn test_entry_removed_after_settle() {
        let (_clock, tracker) = tracker();

        let fut = tracker.begin_or_join(key("common"), || async move { 7u32 }.boxed());
        assert_eq!(tracker.len(), 1);

        assert_eq!(fut.await, 7);
        // Entry removal happens inside the spawned task; yield until it runs.
        for _ in 0..10 {
            if tracker.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_load_completes_even_when_waiters_drop() {
        let (_clock, tracker) = tracker();
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();

        let fut = tracker.begin_or_join(key("common"), move || {
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                completed_clone.fetch_add(1, Ordering::SeqCst);
                1u32
            }
            .boxed()
        });
        drop(fut);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_load_yields_default_and_clears_entry() {
        let (_clock, tracker) = tracker();

        let fut = tracker.begin_or_join(key("common"), || {
            async move { panic!("load blew up") }.boxed()
        });

        assert_eq!(fut.await, 0, "waiters should receive the default value");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tracker.is_empty());
    }

    // ==================== Sweep Tests ====================

    #[tokio::test]
    async fn test_evict_older_than_removes_stale_entries() {
        let (clock, tracker) = tracker();

        // A load that never finishes
        let _fut = tracker.begin_or_join(key("stuck"), || futures::future::pending().boxed());
        assert_eq!(tracker.len(), 1);

        clock.advance(Duration::from_secs(29));
        assert_eq!(tracker.evict_older_than(Duration::from_secs(30)), 0);
        assert_eq!(tracker.len(), 1);

        clock.advance(Duration::from_secs(2));
        assert_eq!(tracker.evict_older_than(Duration::from_secs(30)), 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_allows_fresh_start() {
        let (clock, tracker) = tracker();
        let starts = Arc::new(AtomicU32::new(0));

        let starts_a = starts.clone();
        let _stuck = tracker.begin_or_join(key("common"), move || {
            starts_a.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().boxed()
        });

        clock.advance(Duration::from_secs(31));
        tracker.evict_older_than(Duration::from_secs(30));

        let starts_b = starts.clone();
        let fresh = tracker.begin_or_join(key("common"), move || {
            starts_b.fetch_add(1, Ordering::SeqCst);
            async move { 9u32 }.boxed()
        });

        assert_eq!(fresh.await, 9);
        assert_eq!(starts.load(Ordering::SeqCst), 2, "eviction permits a second fetch");
    }

    #[tokio::test]
    async fn test_sweeper_evicts_on_schedule() {
        let (_clock, tracker) = tracker();

        // max_age zero: everything is immediately stale to the sweeper
        let sweeper = tracker.spawn_sweeper(Duration::from_millis(10), Duration::ZERO);

        let _fut = tracker.begin_or_join(key("stuck"), || futures::future::pending().boxed());
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(tracker.is_empty());
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_tracker_dropped() {
        let (_clock, tracker) = tracker();
        let sweeper = tracker.spawn_sweeper(Duration::from_millis(5), Duration::from_secs(30));

        drop(tracker);
        // The sweep task notices the dead weak reference on its next tick.
        tokio::time::timeout(Duration::from_millis(200), sweeper)
            .await
            .expect("sweeper should exit")
            .expect("sweeper should not panic");
    }
}
