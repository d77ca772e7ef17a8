// src/cache/redis_cache.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};

use super::DedupCache;

/// Dedup cache backed by a redis server.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).with_context(|| format!("opening redis {url}"))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .with_context(|| format!("connecting to redis {url}"))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DedupCache for RedisCache {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await.context("redis EXISTS")?;
        Ok(found)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, expiry_secs(ttl))
            .await
            .context("redis SETEX")?;
        Ok(())
    }
}

/// Whole seconds for SETEX, which rejects a zero expiry.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_at_least_one_second() {
        assert_eq!(expiry_secs(Duration::ZERO), 1);
        assert_eq!(expiry_secs(Duration::from_millis(999)), 1);
        assert_eq!(expiry_secs(Duration::from_millis(5_900)), 5);
        assert_eq!(expiry_secs(Duration::from_secs(86_400)), 86_400);
    }
}
