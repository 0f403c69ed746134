// ============================
// tradingroom-backend/src/room.rs
// ============================
//! Room lifecycle: create, join, read, list and delete trading rooms.
//!
//! The manager validates input, calls the collaborators in a fixed order and
//! persists room metadata last, so a request that fails or is cancelled
//! half-way never leaves a room behind. It holds no locks: two concurrent
//! creates for the same id both succeed and the later write wins.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::Value;
use tracing::{info, instrument, warn};
use tradingroom_common::{Identity, Participant, RoomMetadata, RoomPage};

use crate::auth::{RoomGrant, TokenIssuer};
use crate::catalog::ProductCatalog;
use crate::config::{EnrichmentPolicy, JoinPolicy, PolicySettings, ROOM_TTL};
use crate::error::AppError;
use crate::metrics::{
    ENRICHMENT_DEGRADED, ROOM_CREATED, ROOM_CREATE_FAILED, ROOM_DELETED, ROOM_JOINED, ROOM_LIST_SKIPPED,
    TOKEN_ISSUED,
};
use crate::storage::{Listed, RoomStore, SkipReason};
use crate::validation;

pub type RoomId = String;

/// Page size when the caller gives none
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Upper bound on a single page
pub const MAX_PAGE_SIZE: usize = 500;

/// Result of a full listing
#[derive(Debug, Clone, Default)]
pub struct RoomListing {
    pub rooms: BTreeMap<RoomId, RoomMetadata>,
    /// Keys that were scanned but could not be read back
    pub skipped: Vec<(RoomId, SkipReason)>,
}

/// Orchestrates the room store and the external collaborators
pub struct RoomManager {
    store: RoomStore,
    tokens: Arc<dyn TokenIssuer>,
    catalog: Arc<dyn ProductCatalog>,
    policy: PolicySettings,
    room_ttl: Duration,
}

impl RoomManager {
    /// Create a manager with the default policies and the 12 hour room TTL
    pub fn new(store: RoomStore, tokens: Arc<dyn TokenIssuer>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            store,
            tokens,
            catalog,
            policy: PolicySettings::default(),
            room_ttl: ROOM_TTL,
        }
    }

    pub fn with_policy(mut self, policy: PolicySettings) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_room_ttl(mut self, room_ttl: Duration) -> Self {
        self.room_ttl = room_ttl;
        self
    }

    /// Create (or re-create) a room and return a publisher token for its creator.
    ///
    /// The token is minted before the record is written: a failed issuance
    /// leaves nothing stored. Re-creating an existing room replaces its
    /// record and restarts its TTL.
    #[instrument(skip(self, identity, product_ids, title), fields(user_id = %identity.id, products = product_ids.len()))]
    pub async fn create_room(
        &self,
        identity: &Identity,
        room_id: &str,
        product_ids: &[String],
        title: &str,
    ) -> Result<String, AppError> {
        validation::validate_room_id(room_id)?;
        validation::validate_title(title)?;
        validation::validate_product_ids(product_ids)?;

        let products = self.enrich(product_ids, &identity.id).await?;

        let metadata = RoomMetadata {
            title: title.to_string(),
            publisher: identity.clone(),
            products,
        };

        let participant = Participant::from(identity);
        let token = self
            .tokens
            .issue(&RoomGrant {
                room_id,
                participant: &participant,
                can_publish: true,
            })
            .await
            .inspect_err(|_| {
                counter!(ROOM_CREATE_FAILED, "reason" => "token").increment(1);
            })?;

        self.store
            .put(room_id, &metadata, self.room_ttl)
            .await
            .inspect_err(|_| {
                counter!(ROOM_CREATE_FAILED, "reason" => "storage").increment(1);
            })?;

        counter!(ROOM_CREATED).increment(1);
        info!("room created");
        Ok(token)
    }

    async fn enrich(&self, product_ids: &[String], publisher_id: &str) -> Result<Value, AppError> {
        if product_ids.is_empty() {
            return Ok(Value::Null);
        }

        match self.catalog.fetch(product_ids, publisher_id).await {
            Ok(products) => Ok(products),
            Err(err) => match self.policy.enrichment {
                EnrichmentPolicy::Mandatory => {
                    counter!(ROOM_CREATE_FAILED, "reason" => "enrichment").increment(1);
                    Err(err.into())
                },
                EnrichmentPolicy::Advisory => {
                    counter!(ENRICHMENT_DEGRADED).increment(1);
                    warn!(error = %err, "product enrichment failed, creating room without products");
                    Ok(Value::Null)
                },
            },
        }
    }

    /// Issue a subscriber token. Never touches the room record.
    ///
    /// Under [`JoinPolicy::Strict`] the room must currently exist.
    #[instrument(skip(self, participant), fields(user_id = %participant.id))]
    pub async fn join_room(&self, room_id: &str, participant: &Participant) -> Result<String, AppError> {
        validation::validate_room_id(room_id)?;
        validation::validate_participant_id(&participant.id)?;

        if self.policy.join == JoinPolicy::Strict && self.store.get(room_id).await?.is_none() {
            return Err(AppError::RoomNotFound(room_id.to_string()));
        }

        let token = self
            .tokens
            .issue(&RoomGrant {
                room_id,
                participant,
                can_publish: false,
            })
            .await?;

        counter!(ROOM_JOINED).increment(1);
        Ok(token)
    }

    /// Issue a token for an authenticated caller without creating a room.
    ///
    /// Room existence is not checked; the media server scopes the token to
    /// `room_id` whether or not a record exists.
    #[instrument(skip(self, participant), fields(user_id = %participant.id))]
    pub async fn issue_token(
        &self,
        room_id: &str,
        participant: &Participant,
        can_publish: bool,
    ) -> Result<String, AppError> {
        validation::validate_room_id(room_id)?;
        validation::validate_participant_id(&participant.id)?;

        let token = self
            .tokens
            .issue(&RoomGrant {
                room_id,
                participant,
                can_publish,
            })
            .await?;

        counter!(TOKEN_ISSUED, "publisher" => if can_publish { "true" } else { "false" }).increment(1);
        Ok(token)
    }

    /// Read a room's metadata
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: &str) -> Result<RoomMetadata, AppError> {
        validation::validate_room_id(room_id)?;
        self.store
            .get(room_id)
            .await?
            .ok_or_else(|| AppError::RoomNotFound(room_id.to_string()))
    }

    /// Every live room. Unreadable entries are reported in `skipped`, never fatal.
    ///
    /// Walks the whole keyspace; meant for administration, not request paths.
    #[instrument(skip(self))]
    pub async fn list_rooms(&self) -> Result<RoomListing, AppError> {
        let mut listing = RoomListing::default();
        for entry in self.store.list().await? {
            match entry {
                Listed::Room { room_id, metadata } => {
                    listing.rooms.insert(room_id, metadata);
                },
                Listed::Skipped { room_id, reason } => listing.skipped.push((room_id, reason)),
            }
        }

        if !listing.skipped.is_empty() {
            counter!(ROOM_LIST_SKIPPED).increment(listing.skipped.len() as u64);
        }
        Ok(listing)
    }

    /// One page of rooms, starting at `cursor` (`0` for the first page)
    #[instrument(skip(self))]
    pub async fn list_rooms_page(&self, cursor: u64, count: usize) -> Result<RoomPage, AppError> {
        let page = self.store.list_page(cursor, clamp_page_size(count)).await?;

        let mut result = RoomPage {
            next_cursor: page.next_cursor,
            ..RoomPage::default()
        };
        for entry in page.entries {
            match entry {
                Listed::Room { room_id, metadata } => {
                    result.rooms.insert(room_id, metadata);
                },
                Listed::Skipped { .. } => result.skipped += 1,
            }
        }

        if result.skipped > 0 {
            counter!(ROOM_LIST_SKIPPED).increment(result.skipped as u64);
        }
        Ok(result)
    }

    /// Delete a room. Deleting a room that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn delete_room(&self, room_id: &str) -> Result<(), AppError> {
        validation::validate_room_id(room_id)?;
        self.store.delete(room_id).await?;
        counter!(ROOM_DELETED).increment(1);
        info!("room deleted");
        Ok(())
    }
}

fn clamp_page_size(count: usize) -> usize {
    count.clamp(1, MAX_PAGE_SIZE)
}
