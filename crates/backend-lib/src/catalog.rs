// ============================
// tradingroom-backend/src/catalog.rs
// ============================
//! Product enrichment: resolves product ids into records embedded in a room.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::CatalogSettings;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog responded with non-200 status code: {0}")]
    Status(u16),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),
}

/// Source of product records, scoped to a publisher
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns an opaque JSON payload describing `product_ids`
    async fn fetch(&self, product_ids: &[String], publisher_id: &str) -> Result<Value, CatalogError>;
}

#[derive(Serialize)]
struct FilterRequest<'a> {
    ids: &'a [String],
    publisher: &'a str,
}

#[derive(Deserialize)]
struct FilterResponse {
    #[serde(default)]
    blogs: Value,
}

/// Calls the product filter endpoint of the catalog service
#[derive(Debug, Clone)]
pub struct HttpProductCatalog {
    client: reqwest::Client,
    uri: String,
}

impl HttpProductCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
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
impl ProductCatalog for HttpProductCatalog {
    async fn fetch(&self, product_ids: &[String], publisher_id: &str) -> Result<Value, CatalogError> {
        let response = self
            .client
            .post(&self.uri)
            .json(&FilterRequest {
                ids: product_ids,
                publisher: publisher_id,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body: FilterResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        debug!(requested = product_ids.len(), "fetched product details");
        Ok(body.blogs)
    }
}
