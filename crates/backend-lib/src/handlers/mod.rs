// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod rooms;

pub use rooms::{create_room, delete_room, get_room, issue_token, join_room, list_rooms};
