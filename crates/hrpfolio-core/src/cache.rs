//! In-memory store for upstream payloads with per-category freshness windows.
//!
//! Freshness is evaluated lazily on read; there is no background sweep and no
//! eviction. Entries are replaced in place on refresh, so the store grows with
//! the set of distinct keys (an accepted trade-off). Per-key single-flight
//! guards collapse concurrent fetches of the same missing/stale key onto one
//! upstream call.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

use crate::config::CacheTtls;
use crate::{Interval, Symbol};

/// Payload category. Each category carries its own freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Quote,
    Historical,
    Fundamentals,
}

impl CacheCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Historical => "historical",
            Self::Fundamentals => "fundamentals",
        }
    }
}

impl Display for CacheCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite cache key: (symbol, interval, lookback, category).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub interval: Interval,
    pub lookback: u32,
    pub category: CacheCategory,
}

impl CacheKey {
    pub fn historical(symbol: Symbol, interval: Interval, lookback: u32) -> Self {
        Self {
            symbol,
            interval,
            lookback,
            category: CacheCategory::Historical,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.category, self.symbol, self.interval, self.lookback
        )
    }
}

/// Stored payload plus the instant it was fetched from upstream.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: Instant,
}

/// Outcome of a cache read, freshness already applied.
#[derive(Debug, Clone)]
pub enum CacheLookup<T> {
    Fresh(CacheEntry<T>),
    /// Entry present but older than its category window. Usable as a fallback
    /// when the upstream refresh fails.
    Stale(CacheEntry<T>),
    Miss,
}

#[derive(Debug)]
struct CacheInner<T> {
    map: HashMap<CacheKey, CacheEntry<T>>,
}

/// Thread-safe cache store shared across concurrent requests.
#[derive(Debug)]
pub struct CacheStore<T> {
    ttls: CacheTtls,
    inner: Arc<RwLock<CacheInner<T>>>,
    inflight: Arc<Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>>,
}

impl<T> Clone for CacheStore<T> {
    fn clone(&self) -> Self {
        Self {
            ttls: self.ttls,
            inner: Arc::clone(&self.inner),
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<T: Clone> CacheStore<T> {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            ttls,
            inner: Arc::new(RwLock::new(CacheInner { map: HashMap::new() })),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Quote => self.ttls.quote,
            CacheCategory::Historical => self.ttls.historical,
            CacheCategory::Fundamentals => self.ttls.fundamentals,
        }
    }

    /// Read an entry, classifying it as fresh or stale by its category window.
    pub async fn get(&self, key: &CacheKey) -> CacheLookup<T> {
        let ttl = self.ttl_for(key.category);
        let store = self.inner.read().await;
        match store.map.get(key) {
            Some(entry) if entry.fetched_at.elapsed() <= ttl => {
                CacheLookup::Fresh(entry.clone())
            }
            Some(entry) => CacheLookup::Stale(entry.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Insert or replace the entry for `key`.
    pub async fn put(&self, key: CacheKey, payload: T, fetched_at: Instant) {
        let mut store = self.inner.write().await;
        store.map.insert(key, CacheEntry { payload, fetched_at });
    }

    /// Insert with `fetched_at = now`.
    pub async fn put_now(&self, key: CacheKey, payload: T) {
        self.put(key, payload, Instant::now()).await;
    }

    /// Acquire the single-flight guard for `key`.
    ///
    /// At most one caller holds the guard at a time; waiters should re-check
    /// the cache after acquiring it, since the previous holder usually filled
    /// the entry. Guards are retained per key, matching the store's
    /// no-eviction policy.
    pub async fn flight_guard(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let guard = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        guard.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interval;

    fn key(symbol: &str) -> CacheKey {
        CacheKey::historical(Symbol::parse(symbol).expect("valid"), Interval::OneDay, 30)
    }

    fn store() -> CacheStore<String> {
        CacheStore::new(CacheTtls::default())
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = store();
        assert!(matches!(cache.get(&key("AAPL")).await, CacheLookup::Miss));

        cache.put_now(key("AAPL"), "payload".to_owned()).await;
        match cache.get(&key("AAPL")).await {
            CacheLookup::Fresh(entry) => assert_eq!(entry.payload, "payload"),
            other => panic!("expected fresh entry, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_fresh_until_its_window_elapses() {
        let cache = store();
        let fetched_at = Instant::now();
        cache.put(key("AAPL"), "payload".to_owned(), fetched_at).await;

        tokio::time::advance(Duration::from_secs(3_599)).await;
        assert!(matches!(
            cache.get(&key("AAPL")).await,
            CacheLookup::Fresh(_)
        ));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(
            cache.get(&key("AAPL")).await,
            CacheLookup::Stale(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn quote_window_is_fifteen_minutes() {
        let cache = store();
        let quote_key = CacheKey {
            symbol: Symbol::parse("AAPL").expect("valid"),
            interval: Interval::OneDay,
            lookback: 1,
            category: CacheCategory::Quote,
        };
        cache.put(quote_key.clone(), "q".to_owned(), Instant::now()).await;

        tokio::time::advance(Duration::from_secs(899)).await;
        assert!(matches!(cache.get(&quote_key).await, CacheLookup::Fresh(_)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(cache.get(&quote_key).await, CacheLookup::Stale(_)));
    }

    #[tokio::test]
    async fn replace_in_place_keeps_one_entry_per_key() {
        let cache = store();
        cache.put_now(key("AAPL"), "old".to_owned()).await;
        cache.put_now(key("AAPL"), "new".to_owned()).await;

        assert_eq!(cache.len().await, 1);
        match cache.get(&key("AAPL")).await {
            CacheLookup::Fresh(entry) => assert_eq!(entry.payload, "new"),
            other => panic!("expected fresh entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn flight_guard_serializes_same_key() {
        let cache = store();
        let first = cache.flight_guard(&key("AAPL")).await;

        // A second acquisition of the same key must wait for the first guard.
        let contended = {
            let cache = cache.clone();
            tokio::spawn(async move {
                let _guard = cache.flight_guard(&key("AAPL")).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!contended.is_finished());

        // A different key is unaffected.
        let _other = cache.flight_guard(&key("MSFT")).await;

        drop(first);
        contended.await.expect("task must complete");
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let cache = store();
        cache.put_now(key("AAPL"), "a".to_owned()).await;
        cache.put_now(key("MSFT"), "b".to_owned()).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
