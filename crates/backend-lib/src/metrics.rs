// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const ROOM_CREATED: &str = "room.created";
pub const ROOM_CREATE_FAILED: &str = "room.create.failed";
pub const ROOM_JOINED: &str = "room.joined";
pub const ROOM_DELETED: &str = "room.deleted";
pub const ROOM_LIST_SKIPPED: &str = "room.list.skipped";
pub const ENRICHMENT_DEGRADED: &str = "room.enrichment.degraded";
pub const TOKEN_ISSUED: &str = "token.issued";
