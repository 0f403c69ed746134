// ============================
// crates/backend-lib/src/auth/token_issuer.rs
// ============================
//! Media access tokens for publishers and subscribers.
//!
//! Tokens follow the LiveKit access-token format: an HS256 JWT signed with the
//! API secret, `iss` set to the API key and a `video` grant scoping the holder
//! to one room.
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradingroom_common::Participant;

use crate::config::LiveKitSettings;

/// Failure to mint an access token
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("failed to encode participant metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// What a token should allow
#[derive(Debug, Clone)]
pub struct RoomGrant<'a> {
    pub room_id: &'a str,
    pub participant: &'a Participant,
    /// Publisher tokens may send media, subscriber tokens only receive
    pub can_publish: bool,
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint one token. No caching and no retry.
    async fn issue(&self, grant: &RoomGrant<'_>) -> Result<String, TokenError>;
}

/// `video` claim of a LiveKit access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

/// Claims of a LiveKit access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub metadata: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Serialize)]
struct ParticipantMetadata<'a> {
    photo: &'a str,
}

/// Signs LiveKit tokens locally with the configured key pair
pub struct LiveKitTokenIssuer {
    api_key: String,
    key: EncodingKey,
    ttl_secs: i64,
}

impl LiveKitTokenIssuer {
    pub fn new(settings: &LiveKitSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            key: EncodingKey::from_secret(settings.api_secret.as_bytes()),
            ttl_secs: i64::try_from(settings.token_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    fn claims(&self, grant: &RoomGrant<'_>) -> Result<AccessClaims, TokenError> {
        let now = Utc::now().timestamp();
        let metadata = serde_json::to_string(&ParticipantMetadata {
            photo: &grant.participant.avatar_url,
        })?;

        Ok(AccessClaims {
            iss: self.api_key.clone(),
            sub: grant.participant.id.clone(),
            name: grant.participant.display_name.clone(),
            metadata,
            nbf: now,
            exp: now.saturating_add(self.ttl_secs),
            video: VideoGrant {
                room: grant.room_id.to_string(),
                room_join: true,
                can_publish: grant.can_publish,
                can_subscribe: true,
                can_publish_data: true,
            },
        })
    }
}

#[async_trait]
impl TokenIssuer for LiveKitTokenIssuer {
    async fn issue(&self, grant: &RoomGrant<'_>) -> Result<String, TokenError> {
        let claims = self.claims(grant)?;
        encode(&Header::default(), &claims, &self.key).map_err(|e| TokenError::Signing(e.to_string()))
    }
}
