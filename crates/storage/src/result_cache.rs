//! TTL cache for expensive pipeline results.
//!
//! Entries expire purely by age; there is no size-based eviction. Expired
//! entries are swept on every insert, so keys that are never asked for
//! again do not accumulate. Failures are never stored, so every miss after
//! a failure retries in full.
//!
//! ## Concurrency
//!
//! Readers share an `RwLock`. Computation is serialized per key: the first
//! caller for a key runs the compute function while later callers for the
//! same key wait, then re-check the cache and reuse the stored result.
//! Callers for different keys never wait on each other.
//!
//! ## Metrics
//!
//! - `scene_cache_hits_total`
//! - `scene_cache_misses_total`

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Statistics for the result cache.
///
/// All fields are atomic for lock-free reads.
#[derive(Debug, Default)]
pub struct ResultCacheStats {
    /// Lookups answered from the cache
    pub hits: AtomicU64,
    /// Lookups that had to compute
    pub misses: AtomicU64,
    /// Entries dropped because their TTL elapsed
    pub expired: AtomicU64,
    /// Compute calls that returned an error
    pub failures: AtomicU64,
}

impl ResultCacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Time-bounded memo of `K -> V`.
///
/// `V` is cloned out on every hit; wrap large values in `Arc`.
pub struct ResultCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    in_flight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
    ttl: Duration,
    stats: Arc<ResultCacheStats>,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
            stats: Arc::new(ResultCacheStats::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> Arc<ResultCacheStats> {
        self.stats.clone()
    }

    /// Cached value for `key` if present and younger than the TTL.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless someone refreshed it meanwhile
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.inserted_at.elapsed() >= self.ttl {
                entries.remove(key);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
            } else {
                return Some(entry.value.clone());
            }
        }
        None
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// success. Errors are returned to the caller and not stored.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            self.record_hit(&key);
            return Ok(value);
        }

        let slot = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = slot.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(value) = self.get(&key).await {
            self.release(&key, &slot).await;
            drop(guard);
            self.record_hit(&key);
            return Ok(value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("scene_cache_misses_total").increment(1);
        debug!(key = ?key, "Result cache miss");

        let result = compute().await;
        match &result {
            Ok(value) => {
                let mut entries = self.entries.write().await;
                let swept = self.sweep(&mut entries);
                if swept > 0 {
                    debug!(swept, "Dropped expired entries");
                }
                entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        inserted_at: Instant::now(),
                    },
                );
            }
            Err(_) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "Compute failed, nothing cached");
            }
        }

        self.release(&key, &slot).await;
        drop(guard);
        result
    }

    /// Drop every expired entry, returning how many were removed.
    fn sweep(&self, entries: &mut HashMap<K, CacheEntry<V>>) -> usize {
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let removed = before - entries.len();
        self.stats
            .expired
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Number of stored entries, expired ones included until the next
    /// insert.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn record_hit(&self, key: &K) {
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("scene_cache_hits_total").increment(1);
        debug!(key = ?key, "Result cache hit");
    }

    /// Forget the per-key lock once nobody else holds a handle to it.
    async fn release(&self, key: &K, slot: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One handle in the map, one held by the caller
        if Arc::strong_count(slot) <= 2 {
            in_flight.remove(key);
        }
        // Slots left behind by cancelled callers
        in_flight.retain(|_, s| Arc::strong_count(s) > 1);
    }

    #[cfg(test)]
    async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TTL: Duration = Duration::from_secs(300);

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    async fn compute_ok(calls: Arc<AtomicUsize>, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_skips_compute() {
        let cache: ResultCache<&str, u32> = ResultCache::new(TTL);
        let calls = counter();

        let first = cache
            .get_or_compute("k", || compute_ok(calls.clone(), 7))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        let second = cache
            .get_or_compute("k", || compute_ok(calls.clone(), 8))
            .await
            .unwrap();

        assert_eq!((first, second), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_recomputes() {
        let cache: ResultCache<&str, u32> = ResultCache::new(TTL);
        let calls = counter();

        cache
            .get_or_compute("k", || compute_ok(calls.clone(), 1))
            .await
            .unwrap();
        tokio::time::advance(TTL).await;
        let value = cache
            .get_or_compute("k", || compute_ok(calls.clone(), 2))
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().expired(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache: ResultCache<&str, u32> = ResultCache::new(TTL);
        let calls = counter();

        let err = cache
            .get_or_compute("k", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("backend down".to_string())
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err, "backend down");
        assert!(cache.is_empty().await);

        let value = cache
            .get_or_compute("k", || compute_ok(calls.clone(), 5))
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().failures(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache: ResultCache<(u8, u32), u32> = ResultCache::new(TTL);
        let calls = counter();

        cache
            .get_or_compute((13, 18), || compute_ok(calls.clone(), 1))
            .await
            .unwrap();
        cache
            .get_or_compute((13, 17), || compute_ok(calls.clone(), 2))
            .await
            .unwrap();
        cache
            .get_or_compute((2, 18), || compute_ok(calls.clone(), 3))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_concurrent_callers_compute_once() {
        let cache: Arc<ResultCache<&str, u32>> = Arc::new(ResultCache::new(TTL));
        let calls = counter();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hits(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_sweeps_only_expired() {
        let cache: ResultCache<u32, u32> = ResultCache::new(Duration::from_secs(10));
        let calls = counter();
        cache
            .get_or_compute(1, || compute_ok(calls.clone(), 1))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        cache
            .get_or_compute(2, || compute_ok(calls.clone(), 2))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        // Key 1 is expired but still stored until something is inserted
        assert_eq!(cache.len().await, 2);
        cache
            .get_or_compute(3, || compute_ok(calls.clone(), 3))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&1).await, None);
        assert_eq!(cache.get(&2).await, Some(2));
        assert_eq!(cache.stats().expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hourly_keys_do_not_accumulate() {
        let cache: ResultCache<u32, u32> = ResultCache::new(TTL);
        let calls = counter();

        for hour in 0..48u32 {
            cache
                .get_or_compute(hour, || compute_ok(calls.clone(), hour))
                .await
                .unwrap();
            assert_eq!(cache.len().await, 1, "after hour {}", hour);
            tokio::time::advance(Duration::from_secs(3600)).await;
        }

        assert_eq!(cache.stats().expired(), 47);
        assert_eq!(cache.in_flight_len().await, 0);
    }
}
