// src/cache/mod.rs
//
// Cache Layer - TTL memoization with in-flight de-duplication.
//
// One `Cache` instance per operation family (search, stats, health),
// each with its own TTL. Entries are owned here exclusively; callers
// receive clones, never references into the map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
// tokio's Instant (not std's) so TTL expiry follows the runtime clock,
// including the paused test clock.
use tokio::time::Instant;

use crate::error::AppResult;

struct Slot<V> {
    value: Option<(V, Instant)>,
}

/// TTL cache keyed by string, safe for concurrent use.
///
/// Concurrent callers of [`get_or_compute`](Cache::get_or_compute) with
/// the same key serialize on a per-key async mutex: the first caller
/// computes, the rest find a fresh value when the lock is released.
/// Distinct keys never contend.
pub struct Cache<V> {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Slot<V>>>>>,
    ttl: Duration,
}

impl<V: Clone> Cache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached value for `key` if it is within TTL, otherwise
    /// invoke `compute` exactly once (even under concurrent identical
    /// requests) and store the result. Failures are not cached, so a
    /// transient backend error does not poison the key for the TTL
    /// window.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Self::drop_expired(&mut slots, self.ttl);
            Arc::clone(
                slots
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Slot { value: None }))),
            )
        };

        let mut guard = slot.lock().await;

        if let Some((value, stored_at)) = &guard.value {
            if stored_at.elapsed() < self.ttl {
                debug!("cache hit: {}", key);
                return Ok(value.clone());
            }
        }

        debug!("cache miss: {}", key);
        let value = compute().await?;
        guard.value = Some((value.clone(), Instant::now()));
        Ok(value)
    }

    /// Drop every entry whose value is past TTL. Keys that are never
    /// queried again would otherwise keep their payloads alive forever;
    /// every `get_or_compute` runs this, so the map stays bounded by the
    /// keys seen within one TTL window.
    ///
    /// Slots whose async mutex is held (a computation in flight, or a
    /// waiter about to find the value expired and recompute) are left
    /// alone; empty slots are kept so in-flight de-duplication on a cold
    /// key is never split across two slots.
    fn drop_expired(
        slots: &mut HashMap<String, Arc<tokio::sync::Mutex<Slot<V>>>>,
        ttl: Duration,
    ) {
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => match &guard.value {
                Some((_, stored_at)) => stored_at.elapsed() < ttl,
                None => true,
            },
            Err(_) => true,
        });
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut slots = self.slots.lock().unwrap();
        slots.retain(|key, _| !key.starts_with(prefix));
    }

    /// Drop all entries.
    pub fn invalidate_all(&self) {
        self.slots.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_hit_within_ttl_skips_compute() {
        let cache: Cache<u32> = Cache::new(Duration::from_secs(30));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_recomputes() {
        let cache: Cache<u32> = Cache::new(Duration::from_secs(30));
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };
        cache.get_or_compute("k", compute).await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(2)
        };
        let value = cache.get_or_compute("k", compute).await.unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_evicted() {
        let cache: Cache<u32> = Cache::new(Duration::from_secs(30));

        // One entry per keystroke prefix, none of them re-queried.
        for i in 0..100u32 {
            cache
                .get_or_compute(&format!("search:{}", i), || async { Ok(i) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 100);

        tokio::time::advance(Duration::from_secs(3600)).await;

        // The next touch of the cache sweeps out everything expired.
        cache
            .get_or_compute("search:fresh", || async { Ok(0) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache: Cache<u32> = Cache::new(Duration::from_secs(30));
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(AppError::Other("backend down".to_string()))
            })
            .await;
        assert!(err.is_err());

        let value = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(9)
            })
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_compute_once() {
        let cache: Arc<Cache<u32>> = Arc::new(Cache::new(Duration::from_secs(30)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(42)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache: Cache<u32> = Cache::new(Duration::from_secs(30));
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };
        cache.get_or_compute("search:abc", compute).await.unwrap();

        cache.invalidate_prefix("search:");
        assert!(cache.is_empty());

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };
        cache.get_or_compute("search:abc", compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
