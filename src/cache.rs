//! Explicit cache service.
//!
//! Nothing in the pipeline caches implicitly. Components that want caching
//! are handed a [`Cache`]; the usual way is to wrap a fetcher in
//! [`CachingFetcher`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::Fetcher;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

struct Entry {
    value: String,
    /// `None` when the TTL reaches past the clock's range.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache. Expired entries are ignored on read and dropped by
/// [`MemoryCache::purge_expired`].
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove expired entries. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }
}

/// Fetcher decorator that serves repeated requests from a cache.
///
/// Only successful responses are stored; failures always reach the inner fetcher.
pub struct CachingFetcher {
    inner: Arc<dyn Fetcher>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CachingFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn key(target: &str, payload: Option<&serde_json::Value>) -> String {
        match payload {
            Some(body) => format!("{target}#{body}"),
            None => target.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for CachingFetcher {
    async fn fetch(
        &self,
        target: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, FetchError> {
        let key = Self::key(target, payload);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(url = %target, "Cache hit");
            return Ok(hit);
        }
        let body = self.inner.fetch(target, payload).await?;
        self.cache.set(&key, body.clone(), self.ttl).await;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(
            &self,
            target: &str,
            _payload: Option<&serde_json::Value>,
        ) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(FetchError::HttpStatus {
                    target: target.to_string(),
                    code: 500,
                });
            }
            Ok(format!("{target}#{n}"))
        }
    }

    fn counting(fail: bool) -> Arc<CountingFetcher> {
        Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), Duration::from_secs(10)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), Duration::from_secs(u64::MAX)).await;

        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn caching_fetcher_serves_repeat_requests() {
        let inner = counting(false);
        let fetcher = CachingFetcher::new(inner.clone(), MemoryCache::new(), Duration::from_secs(60));

        let first = fetcher.fetch("https://feed.test/a", None).await.unwrap();
        let second = fetcher.fetch("https://feed.test/a", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // Different payload is a different key.
        let payload = serde_json::json!({"page": 2});
        fetcher.fetch("https://feed.test/a", Some(&payload)).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = counting(true);
        let cache = MemoryCache::new();
        let fetcher = CachingFetcher::new(inner.clone(), cache.clone(), Duration::from_secs(60));

        assert!(fetcher.fetch("https://feed.test/a", None).await.is_err());
        assert!(fetcher.fetch("https://feed.test/a", None).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }
}
