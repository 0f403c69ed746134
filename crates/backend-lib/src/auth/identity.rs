// ============================
// crates/backend-lib/src/auth/identity.rs
// ============================
//! Caller identity resolution against the external identity service.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tradingroom_common::Identity;

use crate::config::AuthSettings;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity service rejected the credential with status {0}")]
    Rejected(u16),

    #[error("identity service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("malformed identity: {0}")]
    Malformed(String),
}

/// Resolves a bearer credential into an [`Identity`]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `authorization` is the raw `Authorization` header value
    async fn resolve(&self, authorization: &str) -> Result<Identity, IdentityError>;
}

/// `{"status": "...", "data": {...}}`, only `data` is read
#[derive(Deserialize)]
struct IdentityEnvelope {
    data: Identity,
}

/// Forwards the caller's `Authorization` header to the identity service
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    uri: String,
}

impl HttpIdentityProvider {
    pub fn new(settings: &AuthSettings) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            uri: settings.uri.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, authorization: &str) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .get(&self.uri)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let envelope: IdentityEnvelope = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;

        let identity = envelope.data;
        if identity.id.trim().is_empty() {
            return Err(IdentityError::Malformed("identity without user id".to_string()));
        }

        debug!(user_id = %identity.id, "authentication passed");
        Ok(identity)
    }
}
