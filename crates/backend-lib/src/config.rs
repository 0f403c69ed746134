// ============================
// tradingroom-backend/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Fixed lifetime of a room entry (12 hours)
pub const ROOM_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Environment variable prefix, nested keys are split on `__`
pub const ENV_PREFIX: &str = "TRADINGROOM_";

/// Credentials of `livekit-server --dev`
pub const DEV_LIVEKIT_KEY: &str = "devkey";
pub const DEV_LIVEKIT_SECRET: &str = "secret";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Room TTL in seconds
    pub room_ttl_secs: u64,
    /// Key-value backend
    pub storage: StorageSettings,
    /// Identity service
    pub auth: AuthSettings,
    /// Media token signing
    pub livekit: LiveKitSettings,
    /// Product catalog service
    pub catalog: CatalogSettings,
    /// Room lifecycle policies
    pub policy: PolicySettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Shared Redis instance
    Redis,
    /// In-process map, for development and tests
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub redis_url: String,
}

/// Room routes that may be served without an identity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRoute {
    Get,
    List,
    Join,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Endpoint returning the caller identity for an `Authorization` header
    pub uri: String,
    pub timeout_secs: u64,
    /// Routes deliberately left public. Create is always protected.
    #[serde(default)]
    pub public_routes: Vec<RoomRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveKitSettings {
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Endpoint resolving product ids for a publisher
    pub uri: String,
    pub timeout_secs: u64,
}

/// Whether joining requires the room to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    #[default]
    Strict,
    Permissive,
}

/// Whether a failed product lookup aborts room creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentPolicy {
    #[default]
    Mandatory,
    Advisory,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default)]
    pub join: JoinPolicy,
    #[serde(default)]
    pub enrichment: EnrichmentPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            room_ttl_secs: ROOM_TTL.as_secs(),
            storage: StorageSettings {
                backend: StorageBackend::Redis,
                redis_url: "redis://127.0.0.1:6379/".to_string(),
            },
            auth: AuthSettings {
                uri: "http://127.0.0.1:8888/api/users/me".to_string(),
                timeout_secs: 10,
                public_routes: Vec::new(),
            },
            livekit: LiveKitSettings {
                api_key: DEV_LIVEKIT_KEY.to_string(),
                api_secret: DEV_LIVEKIT_SECRET.to_string(),
                token_ttl_secs: 6 * 60 * 60,
            },
            catalog: CatalogSettings {
                uri: "https://go.paxintrade.com/api/blog/filterByIds".to_string(),
                timeout_secs: 10,
            },
            policy: PolicySettings::default(),
        }
    }
}

impl Settings {
    /// Load from `config.{toml,yaml,json}` in the working directory and the environment
    pub fn load() -> Result<Self> {
        let figment = Self::base()
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Json::file("config.json"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Load from an explicit TOML file, environment still takes precedence
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        let figment = Self::base()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extract and validate settings from an arbitrary provider stack
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log_level {:?}, expected one of {:?}", self.log_level, LOG_LEVELS);
        }
        if self.room_ttl_secs == 0 {
            bail!("room_ttl_secs must be greater than zero");
        }
        if self.storage.backend == StorageBackend::Redis && self.storage.redis_url.trim().is_empty() {
            bail!("storage.redis_url is required for the redis backend");
        }
        if self.auth.uri.trim().is_empty() {
            bail!("auth.uri must not be empty");
        }
        if self.catalog.uri.trim().is_empty() {
            bail!("catalog.uri must not be empty");
        }
        if self.auth.timeout_secs == 0 || self.catalog.timeout_secs == 0 {
            bail!("collaborator timeouts must be greater than zero");
        }
        if self.livekit.api_key.is_empty() || self.livekit.api_secret.is_empty() {
            bail!("livekit.api_key and livekit.api_secret are required");
        }
        if self.livekit.token_ttl_secs == 0 {
            bail!("livekit.token_ttl_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room_ttl_secs)
    }

    /// Shared-store deployment still signing with the public dev secret
    pub fn signs_with_dev_credentials_in_production(&self) -> bool {
        self.storage.backend == StorageBackend::Redis
            && (self.livekit.api_key == DEV_LIVEKIT_KEY || self.livekit.api_secret == DEV_LIVEKIT_SECRET)
    }

    /// Whether `route` is served without an identity check
    pub fn is_public(&self, route: RoomRoute) -> bool {
        self.auth.public_routes.contains(&route)
    }
}
