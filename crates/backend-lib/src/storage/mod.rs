// ============================
// tradingroom-backend/src/storage/mod.rs
// ============================
//! Storage abstraction over a shared key-value backend with native expiry.
//!
//! A [`KvBackend`] only knows about strings and TTLs. [`RoomStore`] layers the
//! `room:` namespace and the JSON encoding of [`RoomMetadata`] on top of it.
//! Every consistency guarantee comes from the backend's single-key atomicity,
//! nothing here takes a lock.
//!
//! [`RoomMetadata`]: tradingroom_common::RoomMetadata

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod redis_backend;
mod rooms;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use rooms::{Listed, ListPage, RoomStore, SkipReason, ROOM_KEY_PREFIX};

/// Errors raised by a key-value backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to encode room: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Trait for key-value backends.
///
/// Implementations must be safe to share across concurrent request handlers
/// without external synchronization.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Unconditionally replace `key`, restarting its expiry clock at `ttl`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Read a live key; `None` when missing or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Read several keys at once, positions match `keys`
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StorageError>;

    /// Remove `key`; removing a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// One step of a cursor scan over keys starting with `prefix`.
    ///
    /// Cursor `0` starts a scan; a returned cursor of `0` ends it. Keys may be
    /// repeated across steps, and keys written during the scan may or may not appear.
    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StorageError>;
}
