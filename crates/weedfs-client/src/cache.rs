//! Volume location cache.
//!
//! Maps a volume id to the replicas the master reported for it, together with
//! the time of the lookup. Entries are checked lazily on read (`now - fetched_at
//! <= ttl`) and are only ever replaced by a later successful fetch; there is no
//! background eviction and no fallback to a stale entry when a refresh fails.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use weedfs_core::{LocationSet, WeedError};

/// Time source for cache freshness checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. It can step backwards (NTP corrections); an entry whose
/// fetch time lies ahead of `now` is treated as stale, so a backward step costs
/// one refetch instead of extending the entry's life.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used to simulate cache expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::zero());
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cached lookup result with its fetch time
#[derive(Debug, Clone)]
struct CacheEntry {
    locations: LocationSet,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age <= ttl,
            // fetched "in the future": the clock went backwards
            Err(_) => false,
        }
    }
}

/// Read-through cache of volume locations, shared by clones.
///
/// Concurrent misses for the same volume may each run their fetch; the last
/// completed fetch wins. The map lock is never held across a fetch, and readers
/// always see a whole entry.
#[derive(Debug, Clone)]
pub struct LocationCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Return the cached locations of `volume_id` if they are at most `ttl` old,
    /// otherwise run `fetch`, store its result with a fresh timestamp and return
    /// it. A failed fetch leaves the cache untouched and returns the error.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        volume_id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<LocationSet, WeedError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<LocationSet, WeedError>>,
    {
        let now = self.clock.now();

        // Check cache first
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(volume_id) {
                if entry.is_fresh(now, ttl) {
                    tracing::debug!(volume_id = %volume_id, "Location cache hit");
                    return Ok(entry.locations.clone());
                }
            }
        }

        tracing::debug!(volume_id = %volume_id, "Location cache miss");
        let locations = fetch(volume_id.to_string()).await?;

        {
            let mut entries = self.entries.write().await;
            entries.insert(
                volume_id.to_string(),
                CacheEntry {
                    locations: locations.clone(),
                    fetched_at: self.clock.now(),
                },
            );
        }

        Ok(locations)
    }

    /// When `volume_id` was last fetched, fresh or not.
    pub async fn fetched_at(&self, volume_id: &str) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(volume_id)
            .map(|entry| entry.fetched_at)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weedfs_core::Location;

    const TTL: Duration = Duration::from_secs(60);

    fn sample_set() -> LocationSet {
        LocationSet::new(vec![Location::new("127.0.0.1:8080", "localhost:8080")])
    }

    fn manual_cache() -> (LocationCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (LocationCache::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_hits_cache() {
        let (cache, clock) = manual_cache();
        let calls = AtomicUsize::new(0);
        let fetch = |_: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(sample_set()) }
        };

        let first = cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        clock.advance(Duration::from_secs(59));
        let second = cache.get_or_fetch("3", TTL, fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_after_ttl_refetches_and_updates_timestamp() {
        let (cache, clock) = manual_cache();
        let calls = AtomicUsize::new(0);
        let fetch = |_: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(sample_set()) }
        };

        cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        let first_fetch = cache.fetched_at("3").await.unwrap();

        clock.advance(Duration::from_secs(61));
        cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        let second_fetch = cache.fetched_at("3").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_fetch - first_fetch, TimeDelta::seconds(61));
    }

    #[tokio::test]
    async fn entry_exactly_ttl_old_is_still_fresh() {
        let (cache, clock) = manual_cache();
        let calls = AtomicUsize::new(0);
        let fetch = |_: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(sample_set()) }
        };

        cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        clock.advance(TTL);
        cache.get_or_fetch("3", TTL, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_fall_back_to_stale_entry() {
        let (cache, clock) = manual_cache();
        cache
            .get_or_fetch("3", TTL, |_| async { Ok(sample_set()) })
            .await
            .unwrap();
        let fetched = cache.fetched_at("3").await;

        clock.advance(Duration::from_secs(120));
        let result = cache
            .get_or_fetch("3", TTL, |_| async {
                Err(WeedError::resolution("master unreachable"))
            })
            .await;

        assert_eq!(result, Err(WeedError::resolution("master unreachable")));
        assert_eq!(cache.fetched_at("3").await, fetched);
    }

    #[tokio::test]
    async fn failed_first_fetch_caches_nothing() {
        let cache = LocationCache::new();
        let result = cache
            .get_or_fetch("9", TTL, |vid| async move {
                Err(WeedError::NoLocationAvailable(vid))
            })
            .await;

        assert_eq!(result, Err(WeedError::NoLocationAvailable("9".to_string())));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn volumes_are_cached_independently() {
        let cache = LocationCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = |_: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(sample_set()) }
        };

        cache.get_or_fetch("1", TTL, fetch).await.unwrap();
        cache.get_or_fetch("2", TTL, fetch).await.unwrap();
        cache.get_or_fetch("1", TTL, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn clock_stepping_backwards_forces_refetch() {
        let (cache, clock) = manual_cache();
        let calls = AtomicUsize::new(0);
        let fetch = |_: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(sample_set()) }
        };

        cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        let first_fetch = cache.fetched_at("3").await.unwrap();

        clock.set(first_fetch - TimeDelta::hours(1));
        cache.get_or_fetch("3", TTL, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.fetched_at("3").await,
            Some(first_fetch - TimeDelta::hours(1))
        );

        // the new timestamp is consistent with the clock again
        clock.advance(Duration::from_secs(30));
        cache.get_or_fetch("3", TTL, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_of_live_entry_never_fetch() {
        let (cache, clock) = manual_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let warm = calls.clone();
        let warmed = cache
            .get_or_fetch("5", TTL, move |_| {
                warm.fetch_add(1, Ordering::SeqCst);
                async { Ok(sample_set()) }
            })
            .await
            .unwrap();
        clock.advance(Duration::from_secs(30));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("5", TTL, move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            Ok(LocationSet::new(vec![Location::new(
                                "10.9.9.9:8080",
                                "",
                            )]))
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), warmed);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_return_whole_entries() {
        let cache = LocationCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("5", TTL, |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok(sample_set()) }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), sample_set());
        }
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.len().await, 1);
    }
}
