// src/cache/memory.rs
// In-process dedup cache. Entries expire like redis keys but vanish with the process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use super::DedupCache;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        let map = self.inner.lock().expect("cache mutex poisoned");
        map.get(key)
            .filter(|e| !e.is_expired(Instant::now()))
            .map(|e| e.value.clone())
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.inner.lock().expect("cache mutex poisoned");
        map.values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DedupCache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        match map.get(key) {
            Some(e) if e.is_expired(now) => {
                map.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.inner
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("k", "v", Duration::ZERO).await.unwrap();
        assert!(!cache.exists("k").await.unwrap());

        cache
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_lives_until_its_ttl() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("c:1", "bio", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.exists("c:1").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.exists("c:1").await.unwrap());
        assert!(cache.is_empty());
    }
}
