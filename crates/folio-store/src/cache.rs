//! In-process key-value cache
//!
//! Backs refresh tokens and the access-token blacklist with a moka cache.
//! Unlike a single cache-wide TTL, every entry carries its own lifetime so
//! blacklist entries (minutes) and refresh tokens (days) share one store.
//!
//! The cache has no size bound. Entries leave only by expiry or `delete`,
//! so a write that returns `Ok` stays readable until its TTL is up.

use async_trait::async_trait;
use folio_core::config::CacheSettings;
use folio_core::{CacheError, KeyValueCache};
use moka::future::Cache;
use moka::Expiry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Option<Duration>,
}

/// Expiry policy reading the TTL stored alongside each value
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Hit/miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// moka-backed `KeyValueCache`
#[derive(Clone)]
pub struct MemoryCache {
    cache: Cache<String, Entry>,
    stats: Arc<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_config(&CacheSettings::default())
    }

    pub fn with_config(config: &CacheSettings) -> Self {
        let cache = Cache::builder()
            .initial_capacity(config.initial_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending expirations and bookkeeping now
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn check_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("empty key".to_string()));
    }
    Ok(())
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        check_key(key)?;
        let entry = Entry {
            value: Arc::from(value),
            ttl: (!ttl.is_zero()).then_some(ttl),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        check_key(key)?;
        match self.cache.get(key).await {
            Some(entry) => {
                self.stats.record_hit();
                Ok(Some(entry.value.to_string()))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        check_key(key)?;
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();

        cache.set("refresh:1", "abc", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("refresh:1").await.unwrap().as_deref(), Some("abc"));

        cache.delete("refresh:1").await.unwrap();
        assert_eq!(cache.get("refresh:1").await.unwrap(), None);

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = MemoryCache::new();
        cache.set("k", "first", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "second", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_entries_expire_individually() {
        let cache = MemoryCache::new();
        cache.set("short", "x", Duration::from_millis(50)).await.unwrap();
        cache.set("long", "y", Duration::from_secs(60)).await.unwrap();
        cache.set("forever", "z", Duration::ZERO).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("y"));
        assert_eq!(cache.get("forever").await.unwrap().as_deref(), Some("z"));
    }

    #[tokio::test]
    async fn test_busy_cache_keeps_new_entries() {
        let cache = MemoryCache::with_config(&CacheSettings {
            initial_capacity: 16,
        });

        for i in 0..5_000 {
            let key = format!("refresh_token:{i}");
            cache.set(&key, "token", Duration::from_secs(3600)).await.unwrap();
            for _ in 0..5 {
                cache.get(&key).await.unwrap();
            }
        }
        cache.run_pending_tasks().await;

        cache
            .set("jwt_blacklist:late", "blocked", Duration::from_secs(900))
            .await
            .unwrap();
        cache.run_pending_tasks().await;

        assert_eq!(
            cache.get("jwt_blacklist:late").await.unwrap().as_deref(),
            Some("blocked")
        );
        assert_eq!(
            cache.get("refresh_token:0").await.unwrap().as_deref(),
            Some("token")
        );
        assert_eq!(cache.entry_count(), 5_001);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let cache = MemoryCache::new();
        assert!(matches!(
            cache.set("", "x", Duration::from_secs(1)).await,
            Err(CacheError::InvalidKey(_))
        ));
    }
}
