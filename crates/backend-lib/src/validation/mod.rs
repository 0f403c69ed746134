// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation, applied once at the manager boundary before any remote call.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// Common validation constants
pub const MAX_ROOM_ID_LENGTH: usize = 128;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_PRODUCTS: usize = 100;

// Room ids end up inside `room:<id>` keys and SCAN patterns, so glob
// metacharacters and separators are rejected.
static ROOM_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid room ID: {0}")]
    InvalidRoomId(String),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Invalid products: {0}")]
    InvalidProducts(String),

    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a caller-supplied room ID
pub fn validate_room_id(room_id: &str) -> ValidationResult<&str> {
    if room_id.is_empty() {
        return Err(ValidationError::InvalidRoomId(
            "Room ID must not be empty".to_string(),
        ));
    }

    if room_id.len() > MAX_ROOM_ID_LENGTH {
        return Err(ValidationError::InvalidRoomId(format!(
            "Room ID must be at most {MAX_ROOM_ID_LENGTH} characters"
        )));
    }

    if !ROOM_ID_REGEX.is_match(room_id) {
        return Err(ValidationError::InvalidRoomId(
            "Room ID may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }

    Ok(room_id)
}

/// Validate a room title
pub fn validate_title(title: &str) -> ValidationResult<&str> {
    if title.trim().is_empty() {
        return Err(ValidationError::InvalidTitle(
            "Title must not be empty".to_string(),
        ));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::InvalidTitle(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }

    Ok(title)
}

/// Validate the product ids attached to a new room
pub fn validate_product_ids(ids: &[String]) -> ValidationResult<&[String]> {
    if ids.len() > MAX_PRODUCTS {
        return Err(ValidationError::InvalidProducts(format!(
            "At most {MAX_PRODUCTS} products can be attached to a room"
        )));
    }

    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::InvalidProducts(
            "Product IDs must not be empty".to_string(),
        ));
    }

    Ok(ids)
}

/// Validate the id of a participant asking to join
pub fn validate_participant_id(id: &str) -> ValidationResult<&str> {
    if id.trim().is_empty() {
        return Err(ValidationError::InvalidParticipant(
            "userId must not be empty".to_string(),
        ));
    }
    Ok(id)
}
