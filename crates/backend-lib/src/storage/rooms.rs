//! Room records on top of a [`KvBackend`].
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use tradingroom_common::RoomMetadata;

use super::{KvBackend, StorageError};

/// Namespace of every room key
pub const ROOM_KEY_PREFIX: &str = "room:";

/// Page size used when walking the whole keyspace
const FULL_SCAN_PAGE: usize = 200;

/// Why a scanned key did not produce a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The key expired or was deleted between the scan and the read
    Expired,
    /// The stored value is not a valid room record
    Corrupt(String),
}

/// Outcome for one scanned key
#[derive(Debug, Clone, PartialEq)]
pub enum Listed {
    Room { room_id: String, metadata: RoomMetadata },
    Skipped { room_id: String, reason: SkipReason },
}

/// One step of a paginated listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<Listed>,
    /// Cursor for the next page, `None` once the scan is complete
    pub next_cursor: Option<u64>,
}

/// Keyed storage of room metadata with a bounded lifetime per entry
#[derive(Clone)]
pub struct RoomStore {
    backend: Arc<dyn KvBackend>,
}

fn room_key(room_id: &str) -> String {
    format!("{ROOM_KEY_PREFIX}{room_id}")
}

impl RoomStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Replace the record for `room_id` and restart its TTL.
    ///
    /// Last writer wins; there is no existence or version check.
    pub async fn put(&self, room_id: &str, metadata: &RoomMetadata, ttl: Duration) -> Result<(), StorageError> {
        let json = serde_json::to_string(metadata)?;
        self.backend.set_with_ttl(&room_key(room_id), &json, ttl).await
    }

    /// Read a room. `Ok(None)` for rooms never created, deleted or expired.
    ///
    /// A record that no longer decodes is reported as a backend error rather
    /// than as a missing room.
    pub async fn get(&self, room_id: &str) -> Result<Option<RoomMetadata>, StorageError> {
        let Some(raw) = self.backend.get(&room_key(room_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Backend(format!("corrupt record for room {room_id}: {e}")))
    }

    /// Remove a room; removing a missing room succeeds
    pub async fn delete(&self, room_id: &str) -> Result<(), StorageError> {
        self.backend.delete(&room_key(room_id)).await
    }

    /// Read one page of rooms starting at `cursor` (`0` for the first page)
    pub async fn list_page(&self, cursor: u64, count: usize) -> Result<ListPage, StorageError> {
        let (next, keys) = self.backend.scan(ROOM_KEY_PREFIX, cursor, count).await?;
        let values = self.backend.get_many(&keys).await?;

        let entries = keys
            .into_iter()
            .zip(values)
            .map(|(key, value)| decode_entry(&key, value))
            .collect();

        Ok(ListPage {
            entries,
            next_cursor: (next != 0).then_some(next),
        })
    }

    /// Walk the whole keyspace.
    ///
    /// Not a consistent snapshot under concurrent writes, and linear in the
    /// number of rooms. Prefer [`RoomStore::list_page`] outside of admin tooling.
    pub async fn list(&self) -> Result<Vec<Listed>, StorageError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut cursor = 0;

        loop {
            let page = self.list_page(cursor, FULL_SCAN_PAGE).await?;
            for entry in page.entries {
                if seen.insert(entry.room_id().to_string()) {
                    entries.push(entry);
                }
            }
            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        debug!(count = entries.len(), "scanned room keyspace");
        Ok(entries)
    }
}

impl Listed {
    pub fn room_id(&self) -> &str {
        match self {
            Listed::Room { room_id, .. } | Listed::Skipped { room_id, .. } => room_id,
        }
    }
}

fn decode_entry(key: &str, value: Option<String>) -> Listed {
    let room_id = key.strip_prefix(ROOM_KEY_PREFIX).unwrap_or(key).to_string();
    let Some(raw) = value else {
        return Listed::Skipped {
            room_id,
            reason: SkipReason::Expired,
        };
    };
    match serde_json::from_str::<RoomMetadata>(&raw) {
        Ok(metadata) => Listed::Room { room_id, metadata },
        Err(e) => {
            warn!(%room_id, error = %e, "skipping corrupt room record");
            Listed::Skipped {
                room_id,
                reason: SkipReason::Corrupt(e.to_string()),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use serde_json::json;
    use tradingroom_common::Identity;

    const TTL: Duration = Duration::from_secs(60);

    fn metadata(title: &str) -> RoomMetadata {
        RoomMetadata {
            title: title.to_string(),
            publisher: Identity {
                id: "u1".to_string(),
                display_name: "Alice".to_string(),
                avatar_url: "https://cdn.example/alice.png".to_string(),
                role: "user".to_string(),
                telegram_name: String::new(),
            },
            products: json!([{"id": "p1", "name": "Gold"}]),
        }
    }

    fn store() -> (RoomStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        (RoomStore::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let (store, backend) = store();
        let room = metadata("Gold Market");
        store.put("room1", &room, TTL).await.unwrap();

        assert_eq!(store.get("room1").await.unwrap(), Some(room));
        assert!(backend.get("room:room1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (store, _) = store();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let (store, _) = store();
        store.put("room1", &metadata("First"), TTL).await.unwrap();

        let mut second = metadata("Second");
        second.products = serde_json::Value::Null;
        store.put("room1", &second, TTL).await.unwrap();

        assert_eq!(store.get("room1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_entries() {
        let (store, backend) = store();
        store.put("a", &metadata("A"), TTL).await.unwrap();
        store.put("c", &metadata("C"), TTL).await.unwrap();
        backend.set_with_ttl("room:b", "{not json", TTL).await.unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 3);

        let rooms: Vec<_> = entries
            .iter()
            .filter(|e| matches!(e, Listed::Room { .. }))
            .map(Listed::room_id)
            .collect();
        assert_eq!(rooms, vec!["a", "c"]);

        assert!(entries.iter().any(|e| matches!(
            e,
            Listed::Skipped { room_id, reason: SkipReason::Corrupt(_) } if room_id == "b"
        )));
    }

    #[test]
    fn test_list_page_reports_vanished_keys() {
        let entry = decode_entry("room:gone", None);
        assert_eq!(
            entry,
            Listed::Skipped {
                room_id: "gone".to_string(),
                reason: SkipReason::Expired,
            }
        );
    }

    #[tokio::test]
    async fn test_list_page_cursor() {
        let (store, _) = store();
        for id in ["r1", "r2", "r3"] {
            store.put(id, &metadata(id), TTL).await.unwrap();
        }

        let first = store.list_page(0, 2).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        let cursor = first.next_cursor.unwrap();

        let second = store.list_page(cursor, 2).await.unwrap();
        assert_eq!(second.entries.len(), 1);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_on_get_is_a_storage_error() {
        let (store, backend) = store();
        backend.set_with_ttl("room:bad", "42", TTL).await.unwrap();
        assert!(matches!(
            store.get("bad").await,
            Err(StorageError::Backend(_))
        ));
    }
}
