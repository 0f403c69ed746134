// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between trading room clients and the streaming server.
//! This module defines the HTTP request/response bodies and the persisted room record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status string carried by every successful response
pub const STATUS_SUCCESS: &str = "success";

/// Status string carried by every error response
pub const STATUS_ERROR: &str = "error";

/// A validated caller, as returned by the identity service.
///
/// Field names follow the identity service's wire format so a publisher
/// snapshot stored inside a room reads back exactly as it was received.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    /// Stable, unique user id
    #[serde(rename = "userID")]
    pub id: String,
    /// Display name
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Avatar URL
    #[serde(rename = "photo", default)]
    pub avatar_url: String,
    /// Role assigned by the identity service
    #[serde(default)]
    pub role: String,
    /// Telegram handle, when the user linked one
    #[serde(rename = "telegramname", default)]
    pub telegram_name: String,
}

/// Someone asking for a media token in a room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl From<&Identity> for Participant {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            display_name: identity.display_name.clone(),
            avatar_url: identity.avatar_url.clone(),
        }
    }
}

/// Persisted room record, stored under `room:<roomId>`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoomMetadata {
    /// Room title
    pub title: String,
    /// Creator identity, snapshotted at creation time
    pub publisher: Identity,
    /// Enriched product records; `null` when no products were requested
    #[serde(default)]
    pub products: Value,
}

/// Body of `POST /streaming/room/create`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateRoomRequest {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(default)]
    pub products: Vec<String>,
    pub title: String,
}

/// Body of `POST /streaming/room/join`
///
/// The participant fields are only read when the join route is served
/// without authentication; otherwise the caller's identity is used.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct JoinRoomRequest {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Body of `POST /auth/token`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TokenRequest {
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// Ask for a publisher token instead of a subscriber one
    #[serde(rename = "canPublish", default)]
    pub can_publish: bool,
}

/// Query of the get and delete routes
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RoomQuery {
    #[serde(rename = "roomId", default)]
    pub room_id: Option<String>,
}

/// Query of the list route
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub cursor: Option<u64>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Access token handed back by create and join
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub token: String,
}

/// One page of the room listing
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomPage {
    /// Rooms keyed by room id
    pub rooms: BTreeMap<String, RoomMetadata>,
    /// Number of entries that could not be read back
    pub skipped: usize,
    /// Cursor for the next page, absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<u64>,
}

/// Success envelope: `{"status":"success","data":...}`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in a success envelope
    pub fn success(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success envelope without a payload
    pub fn ok() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            data: None,
        }
    }
}
