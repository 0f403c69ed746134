//! In-process key-value backend with per-entry expiry.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{KvBackend, StorageError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Scan cursors, each naming the last key a page returned.
///
/// A cursor is reused whenever a page ends on the same key, so the table
/// grows with the keys that ever ended a page, not with the number of scans.
#[derive(Debug)]
struct ScanCursors {
    by_id: DashMap<u64, String>,
    by_key: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl Default for ScanCursors {
    fn default() -> Self {
        Self {
            by_id: DashMap::new(),
            by_key: DashMap::new(),
            // 0 starts and ends a scan
            next_id: AtomicU64::new(1),
        }
    }
}

impl ScanCursors {
    fn resume_after(&self, key: &str) -> u64 {
        *self.by_key.entry(key.to_string()).or_insert_with(|| {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.by_id.insert(id, key.to_string());
            id
        })
    }

    fn last_key(&self, cursor: u64) -> Option<String> {
        self.by_id.get(&cursor).map(|key| key.clone())
    }
}

/// `DashMap`-backed implementation of [`KvBackend`].
///
/// Deadlines are read from the tokio clock so a paused test runtime can
/// fast-forward through a TTL. Expired entries are invisible to every read
/// and are purged lazily, there is no sweeper task.
///
/// Scans walk keys in sorted order and resume strictly after the last key
/// of the previous page, so deletes and expiries between pages never hide
/// a key that is still live.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
    cursors: Arc<ScanCursors>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str, now: Instant) -> Option<String> {
        let state = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));

        match state {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                None
            },
            None => None,
        }
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.live_value(key, Instant::now()))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StorageError> {
        let now = Instant::now();
        Ok(keys.iter().map(|key| self.live_value(key, now)).collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StorageError> {
        let after = match cursor {
            0 => None,
            id => match self.cursors.last_key(id) {
                Some(last) => Some(last),
                // a cursor this backend never handed out ends the scan
                None => return Ok((0, Vec::new())),
            },
        };

        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(prefix))
            .filter(|key| after.as_ref().is_none_or(|last| key > last))
            .collect();
        keys.sort_unstable();

        let count = count.max(1);
        let more = keys.len() > count;
        keys.truncate(count);

        let next = match keys.last() {
            Some(last) if more => self.cursors.resume_after(last),
            _ => 0,
        };
        Ok((next, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "1", HOUR).await.unwrap();
        assert_eq!(backend.get("room:a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(backend.get("room:b").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "1", HOUR).await.unwrap();

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;
        assert!(backend.get("room:a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.get("room:a").await.unwrap().is_none());
        assert!(backend.entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_ttl() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "1", HOUR).await.unwrap();

        tokio::time::advance(HOUR / 2).await;
        backend.set_with_ttl("room:a", "2", HOUR).await.unwrap();

        tokio::time::advance(HOUR * 3 / 4).await;
        assert_eq!(backend.get("room:a").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "1", HOUR).await.unwrap();
        backend.delete("room:a").await.unwrap();
        backend.delete("room:a").await.unwrap();
        assert!(backend.get("room:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_pages_through_prefix() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend.set_with_ttl(&format!("room:{i}"), "x", HOUR).await.unwrap();
        }
        backend.set_with_ttl("other:1", "x", HOUR).await.unwrap();

        let (cursor, first) = backend.scan("room:", 0, 2).await.unwrap();
        assert_eq!(first, vec!["room:0", "room:1"]);
        assert_ne!(cursor, 0);

        let (cursor, second) = backend.scan("room:", cursor, 2).await.unwrap();
        assert_eq!(second, vec!["room:2", "room:3"]);

        let (cursor, last) = backend.scan("room:", cursor, 2).await.unwrap();
        assert_eq!(last, vec!["room:4"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test]
    async fn test_scan_survives_delete_between_pages() {
        let backend = MemoryBackend::new();
        for key in ["room:a", "room:b", "room:c", "room:d"] {
            backend.set_with_ttl(key, "x", HOUR).await.unwrap();
        }

        let (cursor, first) = backend.scan("room:", 0, 2).await.unwrap();
        assert_eq!(first, vec!["room:a", "room:b"]);

        backend.delete("room:a").await.unwrap();

        let (cursor, second) = backend.scan("room:", cursor, 2).await.unwrap();
        assert_eq!(second, vec!["room:c", "room:d"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_survives_expiry_between_pages() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "x", Duration::from_secs(1)).await.unwrap();
        for key in ["room:b", "room:c"] {
            backend.set_with_ttl(key, "x", HOUR).await.unwrap();
        }

        let (cursor, first) = backend.scan("room:", 0, 1).await.unwrap();
        assert_eq!(first, vec!["room:a"]);

        tokio::time::advance(Duration::from_secs(2)).await;

        let (cursor, second) = backend.scan("room:", cursor, 1).await.unwrap();
        assert_eq!(second, vec!["room:b"]);
        let (cursor, third) = backend.scan("room:", cursor, 1).await.unwrap();
        assert_eq!(third, vec!["room:c"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test]
    async fn test_scan_cursor_can_be_replayed() {
        let backend = MemoryBackend::new();
        for key in ["room:a", "room:b", "room:c"] {
            backend.set_with_ttl(key, "x", HOUR).await.unwrap();
        }

        let (cursor, _) = backend.scan("room:", 0, 1).await.unwrap();
        let (_, once) = backend.scan("room:", cursor, 1).await.unwrap();
        let (_, again) = backend.scan("room:", cursor, 1).await.unwrap();
        assert_eq!(once, again);
    }

    #[tokio::test]
    async fn test_scan_unknown_cursor_ends_scan() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "x", HOUR).await.unwrap();
        assert_eq!(backend.scan("room:", 42, 10).await.unwrap(), (0, Vec::new()));
    }

    #[tokio::test]
    async fn test_get_many_keeps_positions() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("room:a", "1", HOUR).await.unwrap();
        let values = backend
            .get_many(&["room:missing".to_string(), "room:a".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some("1".to_string())]);
    }
}
