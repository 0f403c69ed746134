//! Shared fixtures for the integration tests.
//!
//! Collaborators are replaced by in-process stubs that count their calls, and
//! rooms live in a [`MemoryBackend`] the test keeps a handle on.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tradingroom_backend::{
    auth::{IdentityError, IdentityProvider, RoomGrant, TokenError, TokenIssuer},
    catalog::{CatalogError, ProductCatalog},
    config::{PolicySettings, Settings},
    room::RoomManager,
    storage::{KvBackend, MemoryBackend, RoomStore, StorageError},
    AppState,
};
use tradingroom_common::Identity;

pub fn identity(id: &str, name: &str) -> Identity {
    Identity {
        id: id.to_string(),
        display_name: name.to_string(),
        avatar_url: format!("https://cdn.example/{id}.png"),
        role: "user".to_string(),
        telegram_name: String::new(),
    }
}

/// Returns a fixed payload, or fails when built with [`StubCatalog::failing`]
pub struct StubCatalog {
    payload: Option<Value>,
    calls: AtomicUsize,
}

impl StubCatalog {
    pub fn returning(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for StubCatalog {
    async fn fetch(&self, _product_ids: &[String], _publisher_id: &str) -> Result<Value, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().ok_or(CatalogError::Status(503))
    }
}

/// A grant as seen by the token stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedGrant {
    pub room_id: String,
    pub participant_id: String,
    pub can_publish: bool,
}

/// Mints `token-<room>-<participant>` and records every grant
#[derive(Default)]
pub struct StubTokenIssuer {
    fail: bool,
    issued: Mutex<Vec<IssuedGrant>>,
}

impl StubTokenIssuer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn issued(&self) -> Vec<IssuedGrant> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenIssuer for StubTokenIssuer {
    async fn issue(&self, grant: &RoomGrant<'_>) -> Result<String, TokenError> {
        // give concurrent requests a chance to interleave
        tokio::task::yield_now().await;
        self.issued.lock().unwrap().push(IssuedGrant {
            room_id: grant.room_id.to_string(),
            participant_id: grant.participant.id.clone(),
            can_publish: grant.can_publish,
        });
        if self.fail {
            return Err(TokenError::Signing("token service down".to_string()));
        }
        Ok(format!("token-{}-{}", grant.room_id, grant.participant.id))
    }
}

/// Accepts `Bearer <user id>`; `expired` is a 401 and `banned` a 403 upstream
pub struct StubIdentityProvider;

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn resolve(&self, authorization: &str) -> Result<Identity, IdentityError> {
        match authorization.strip_prefix("Bearer ") {
            Some("expired") | None => Err(IdentityError::Rejected(401)),
            Some("banned") => Err(IdentityError::Rejected(403)),
            Some(id) => Ok(identity(id, "Caller")),
        }
    }
}

/// Key-value backend whose every call fails, as an unreachable store would
pub struct FailingBackend;

fn unreachable() -> StorageError {
    StorageError::Backend("connection refused (os error 111)".to_string())
}

#[async_trait]
impl KvBackend for FailingBackend {
    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StorageError> {
        Err(unreachable())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(unreachable())
    }

    async fn get_many(&self, _keys: &[String]) -> Result<Vec<Option<String>>, StorageError> {
        Err(unreachable())
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(unreachable())
    }

    async fn scan(&self, _prefix: &str, _cursor: u64, _count: usize) -> Result<(u64, Vec<String>), StorageError> {
        Err(unreachable())
    }
}

/// Everything a test needs to drive and inspect a [`RoomManager`]
pub struct TestEnv {
    /// In-memory store, inspected directly by tests
    pub backend: MemoryBackend,
    /// Store the manager talks to, `backend` unless replaced
    kv: Arc<dyn KvBackend>,
    pub catalog: Arc<StubCatalog>,
    pub tokens: Arc<StubTokenIssuer>,
    pub policy: PolicySettings,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with(StubCatalog::returning(Value::Array(Vec::new())), StubTokenIssuer::default())
    }

    pub fn with(catalog: StubCatalog, tokens: StubTokenIssuer) -> Self {
        let backend = MemoryBackend::new();
        Self {
            kv: Arc::new(backend.clone()),
            backend,
            catalog: Arc::new(catalog),
            tokens: Arc::new(tokens),
            policy: PolicySettings::default(),
        }
    }

    pub fn policy(mut self, policy: PolicySettings) -> Self {
        self.policy = policy;
        self
    }

    /// Route every storage call to a backend that fails
    pub fn failing_storage(mut self) -> Self {
        self.kv = Arc::new(FailingBackend);
        self
    }

    pub fn store(&self) -> RoomStore {
        RoomStore::new(self.kv.clone())
    }

    pub fn manager(&self) -> RoomManager {
        RoomManager::new(self.store(), self.tokens.clone(), self.catalog.clone()).with_policy(self.policy)
    }

    /// Application state wired to this environment
    pub fn state(&self, settings: Settings) -> AppState {
        let manager = self.manager().with_policy(settings.policy);
        AppState::new(manager, Arc::new(StubIdentityProvider), settings)
    }
}
