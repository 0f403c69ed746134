// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tradingroom_common::STATUS_ERROR;

use crate::auth::TokenError;
use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidBody(String),

    #[error("Missing or rejected credentials")]
    Unauthorized,

    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Product enrichment failed: {0}")]
    Enrichment(#[from] CatalogError),

    #[error("Token issuance failed: {0}")]
    TokenIssuance(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::IdentityUnavailable(_) => StatusCode::FORBIDDEN,
            AppError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Enrichment(_) => StatusCode::BAD_GATEWAY,
            AppError::TokenIssuance(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::InvalidBody(_) => "VAL_002",
            AppError::Unauthorized => "AUTH_001",
            AppError::IdentityUnavailable(_) => "AUTH_002",
            AppError::RoomNotFound(_) => "ROOM_001",
            AppError::Enrichment(_) => "ENRICH_001",
            AppError::TokenIssuance(_) => "TOKEN_001",
            AppError::Storage(_) => "STORE_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => "Invalid input provided".to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::IdentityUnavailable(_) => "Forbidden".to_string(),
            AppError::RoomNotFound(_) => "Room not found".to_string(),
            AppError::Enrichment(_) => "Error fetching product details".to_string(),
            AppError::TokenIssuance(_) => "Error while generating access token".to_string(),
            AppError::Storage(_) => "Room storage is unavailable".to_string(),
        }
    }

    /// Message shown to the caller. Client errors explain themselves,
    /// server errors never leak collaborator details.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) | AppError::RoomNotFound(_) => {
                self.to_string()
            },
            _ => self.sanitized_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else if status == StatusCode::NOT_FOUND {
            tracing::debug!(code = error_code, error = %self, "not found");
        } else {
            tracing::warn!(code = error_code, error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "status": STATUS_ERROR,
            "code": error_code,
            "message": self.public_message(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(err: crate::validation::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}
