//! Redis implementation of the key-value backend.
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use super::{KvBackend, StorageError};

/// Redis-backed implementation of [`KvBackend`].
///
/// Wraps a [`ConnectionManager`], which multiplexes one reconnecting
/// connection and is cheap to clone into every request.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect once at startup; the result is shared by every handler
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        // EX takes whole seconds and rejects zero
        let secs = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StorageError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(values)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StorageError> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(format!("{prefix}*"))
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    async fn backend() -> Option<RedisBackend> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(RedisBackend::connect(&url).await.unwrap())
    }

    #[tokio::test]
    #[ignore = "needs a running redis, set REDIS_URL"]
    async fn test_round_trip_against_redis() {
        let Some(backend) = backend().await else {
            return;
        };
        let prefix = format!("test-{}:", uuid::Uuid::new_v4());
        let keys: Vec<String> = (0..25).map(|i| format!("{prefix}{i:02}")).collect();

        for key in &keys {
            backend.set_with_ttl(key, key, HOUR).await.unwrap();
        }

        // SET ... EX
        let mut conn = backend.conn.clone();
        let ttl: i64 = redis::cmd("TTL").arg(&keys[0]).query_async(&mut conn).await.unwrap();
        assert!(ttl > 0 && ttl <= 3600);
        assert_eq!(backend.get(&keys[0]).await.unwrap().as_deref(), Some(keys[0].as_str()));

        // MGET keeps positions, missing keys are None
        let missing = format!("{prefix}missing");
        let values = backend
            .get_many(&[keys[1].clone(), missing])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(keys[1].clone()), None]);

        // SCAN walks every key under the prefix, possibly repeating some
        let mut seen = BTreeSet::new();
        let mut cursor = 0;
        loop {
            let (next, page) = backend.scan(&prefix, cursor, 10).await.unwrap();
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        assert_eq!(seen, keys.iter().cloned().collect::<BTreeSet<_>>());

        for key in &keys {
            backend.delete(key).await.unwrap();
        }
        backend.delete(&keys[0]).await.unwrap();
        assert!(backend.get(&keys[0]).await.unwrap().is_none());
    }
}
