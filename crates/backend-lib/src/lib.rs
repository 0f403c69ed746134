// ============================
// tradingroom-backend/src/lib.rs
// ============================
//! Core backend-lib functionality for the trading room streaming server.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod room;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{HttpIdentityProvider, IdentityProvider, LiveKitTokenIssuer};
use crate::catalog::HttpProductCatalog;
use crate::config::{Settings, StorageBackend};
use crate::room::RoomManager;
use crate::storage::{KvBackend, MemoryBackend, RedisBackend, RoomStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Room lifecycle manager
    pub rooms: Arc<RoomManager>,
    /// Resolves callers on protected routes
    pub identity: Arc<dyn IdentityProvider>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state from already built collaborators
    pub fn new(rooms: RoomManager, identity: Arc<dyn IdentityProvider>, settings: Settings) -> Self {
        Self {
            rooms: Arc::new(rooms),
            identity,
            settings: Arc::new(settings),
        }
    }

    /// Build every collaborator the settings describe.
    ///
    /// Connects to Redis when it is the configured backend, so this fails
    /// fast on an unreachable store.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        if settings.signs_with_dev_credentials_in_production() {
            warn!("livekit dev credentials in use with the redis backend, tokens are signed with a public secret");
        }

        let backend: Arc<dyn KvBackend> = match settings.storage.backend {
            StorageBackend::Redis => {
                let redis = RedisBackend::connect(&settings.storage.redis_url)
                    .await
                    .with_context(|| format!("connecting to {}", settings.storage.redis_url))?;
                Arc::new(redis)
            },
            StorageBackend::Memory => {
                info!("using in-memory room store");
                Arc::new(MemoryBackend::new())
            },
        };

        let rooms = RoomManager::new(
            RoomStore::new(backend),
            Arc::new(LiveKitTokenIssuer::new(&settings.livekit)),
            Arc::new(HttpProductCatalog::new(&settings.catalog)?),
        )
        .with_policy(settings.policy)
        .with_room_ttl(settings.room_ttl());

        let identity = Arc::new(HttpIdentityProvider::new(&settings.auth)?);

        Ok(Self::new(rooms, identity, settings))
    }
}
