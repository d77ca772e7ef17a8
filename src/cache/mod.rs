// src/cache/mod.rs
//! Dedup cache: remembers which accounts, statuses and URLs were already
//! forwarded so each is processed at most once per TTL window.

pub mod memory;
pub mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

/// Key-value store with per-key expiry.
#[async_trait]
pub trait DedupCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

pub fn account_key(id: &str) -> String {
    format!("c:{id}")
}

pub fn status_key(id: &str) -> String {
    format!("s:{id}")
}

pub fn url_key(url: &str) -> String {
    format!("cu:{}", STANDARD.encode(url.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting in this window; the key has been stored.
    New,
    /// Seen before, but caching is disabled for this run.
    Reprocess,
    /// Seen before; skip.
    Duplicate,
}

impl Admission {
    pub fn should_process(&self) -> bool {
        !matches!(self, Admission::Duplicate)
    }
}

/// Applies the dedup policy on top of a [`DedupCache`].
#[derive(Clone)]
pub struct DedupGate {
    cache: Arc<dyn DedupCache>,
    ttl: Duration,
    enabled: bool,
}

impl DedupGate {
    pub fn new(cache: Arc<dyn DedupCache>, ttl: Duration, enabled: bool) -> Self {
        Self {
            cache,
            ttl,
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Check `key`; on first sight store `value` under it with the gate's TTL.
    /// A key that is already present is never rewritten.
    pub async fn admit(&self, key: &str, value: &str) -> Result<Admission> {
        if self.cache.exists(key).await? {
            return Ok(if self.enabled {
                Admission::Duplicate
            } else {
                Admission::Reprocess
            });
        }
        self.cache.set_with_ttl(key, value, self.ttl).await?;
        Ok(Admission::New)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(account_key("42"), "c:42");
        assert_eq!(status_key("42"), "s:42");
        assert_eq!(url_key("http://a.b/"), "cu:aHR0cDovL2EuYi8=");
    }

    #[tokio::test]
    async fn gate_policy() {
        let cache = Arc::new(MemoryCache::new());
        let on = DedupGate::new(cache.clone(), Duration::from_secs(60), true);
        let off = DedupGate::new(cache.clone(), Duration::from_secs(60), false);

        assert_eq!(on.admit("c:1", "bio").await.unwrap(), Admission::New);
        assert_eq!(on.admit("c:1", "bio").await.unwrap(), Admission::Duplicate);
        assert_eq!(off.admit("c:1", "bio").await.unwrap(), Admission::Reprocess);
        assert_eq!(off.admit("c:2", "bio").await.unwrap(), Admission::New);
        assert!(cache.exists("c:2").await.unwrap());
    }
}
