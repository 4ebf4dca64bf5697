//! Win claim gate: idempotent, locally-deduplicated claim submission.
//!
//! The gate fires at most once per (game instance, ticket) from a given
//! device. Cross-device dedup is the server's job; the server-side registry
//! lives in [`crate::session`].

use crate::client::TransportError;
use crate::game::TicketId;
use crate::storage::{KeyValueStore, StorageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument, warn};

/// Dedup key for a win claim: one per (game instance, ticket).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimKey {
    /// Game-instance id at the time of the win.
    pub game_id: String,
    /// Winning ticket.
    pub ticket_id: TicketId,
}

impl ClaimKey {
    /// Creates a claim key.
    pub fn new(game_id: impl Into<String>, ticket_id: impl Into<TicketId>) -> Self {
        Self {
            game_id: game_id.into(),
            ticket_id: ticket_id.into(),
        }
    }

    /// The durable storage key. Includes the instance id, so entries from
    /// superseded games become inert rather than needing cleanup.
    pub fn storage_key(&self) -> String {
        format!("claim/{}/{}", self.game_id, self.ticket_id)
    }
}

/// What is being claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClaimKind {
    /// A complete row.
    Line,
    /// All 15 numbers.
    FullHouse,
}

/// Why the server refused a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRejection {
    /// This exact claim was already registered (possibly by another device
    /// holding the same ticket).
    Duplicate,
    /// The claim named a superseded game instance.
    StaleGame,
    /// The ticket does not actually hold the claimed win.
    NotAWinner,
    /// Any other server-stated reason.
    Other(String),
}

/// Server acknowledgment of a claim submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimAck {
    /// The claim was registered.
    Accepted,
    /// The claim was refused.
    Rejected(ClaimRejection),
}

/// Outcome of passing a win through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The key was already recorded locally; no network call was made.
    AlreadyClaimed,
    /// Submitted and acknowledged; the key is now recorded durably.
    Accepted,
    /// The server refused. Recorded locally only for duplicate refusals.
    Rejected(ClaimRejection),
}

/// Transport for submitting claims; the HTTP client implements this.
#[async_trait]
pub trait ClaimTransport {
    /// Submits one claim to the authoritative side.
    async fn submit_claim(
        &self,
        key: &ClaimKey,
        kind: ClaimKind,
    ) -> Result<ClaimAck, TransportError>;
}

/// Errors surfaced by the gate.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ClaimError {
    /// The submission never reached the server; retry on the next win
    /// detection, nothing was recorded.
    #[display("claim transport failed: {_0}")]
    Transport(TransportError),
    /// The local dedup store failed.
    #[display("claim storage failed: {_0}")]
    Storage(StorageError),
}

/// The gate: durable local dedup in front of a claim transport.
#[derive(Debug)]
pub struct ClaimGate<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ClaimGate<S> {
    /// Creates a gate over the given durable store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// True when the key has already been claimed from this device.
    pub fn is_claimed(&self, key: &ClaimKey) -> bool {
        self.store.get(&key.storage_key()).is_some()
    }

    /// Submits a claim at most once per key.
    ///
    /// Short-circuits without a network call when the key is already
    /// recorded. Records the key on acceptance, and on a `Duplicate`
    /// rejection (the win is registered, just not by us). A transport
    /// failure records nothing, so the next detected win retries —
    /// expected behavior, not a bug.
    #[instrument(skip(self, transport), fields(game_id = %key.game_id, ticket_id = %key.ticket_id, kind = %kind))]
    pub async fn claim<T: ClaimTransport + Sync>(
        &mut self,
        transport: &T,
        key: &ClaimKey,
        kind: ClaimKind,
    ) -> Result<ClaimOutcome, ClaimError> {
        if self.is_claimed(key) {
            info!("Claim already recorded locally, skipping submission");
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        match transport.submit_claim(key, kind).await? {
            ClaimAck::Accepted => {
                self.store.set(&key.storage_key(), "1")?;
                info!("Claim accepted and recorded");
                Ok(ClaimOutcome::Accepted)
            }
            ClaimAck::Rejected(ClaimRejection::Duplicate) => {
                self.store.set(&key.storage_key(), "1")?;
                info!("Claim was a duplicate, recorded to stop resubmission");
                Ok(ClaimOutcome::Rejected(ClaimRejection::Duplicate))
            }
            ClaimAck::Rejected(reason) => {
                warn!(?reason, "Claim rejected, not recorded");
                Ok(ClaimOutcome::Rejected(reason))
            }
        }
    }

    /// Access to the underlying store, for co-located device state.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
