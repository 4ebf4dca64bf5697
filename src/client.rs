//! HTTP participant client for the game server.

use crate::claim::{ClaimAck, ClaimKey, ClaimKind, ClaimRejection, ClaimTransport};
use crate::game::{DrawSnapshot, Ticket, TicketId};
use crate::server::{
    ADMIN_KEY_HEADER, AdminSessionResponse, ClaimRequest, ClaimResponse, GenerateTicketsRequest,
    PresencePingRequest, PresenceResponse, ResetResponse, TicketsResponse,
};
use crate::session::DrawReport;
use async_trait::async_trait;
use derive_more::{Display, Error};
use tracing::{debug, error, info, instrument};

/// Transport error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error: {} at {}:{}", message, file, line)]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a new transport error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("HTTP error: {}", err))
    }
}

/// Read-only source of draw-state snapshots, polled by the sync session.
#[async_trait]
pub trait DrawSource {
    /// Fetches the current snapshot.
    async fn fetch_state(&self) -> Result<DrawSnapshot, TransportError>;
}

/// HTTP client for the bingo server.
#[derive(Debug, Clone)]
pub struct HttpGameClient {
    base_url: String,
    client: reqwest::Client,
    admin_key: Option<String>,
}

impl HttpGameClient {
    /// Creates a client for the given base URL (e.g. `http://host:5000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            admin_key: None,
        }
    }

    /// Attaches the admin key for host-only endpoints.
    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    fn admin_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(key) = &self.admin_key {
            builder = builder.header(ADMIN_KEY_HEADER, key.as_str());
        }
        builder
    }

    /// Draws the next number (host only).
    #[instrument(skip(self))]
    pub async fn draw(&self) -> Result<DrawReport, TransportError> {
        let url = format!("{}/api/draw", self.base_url);
        let response = self.admin_post(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "draw refused (status {})",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Resets to a new game instance (host only).
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<String, TransportError> {
        let url = format!("{}/api/reset", self.base_url);
        let response = self.admin_post(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "reset refused (status {})",
                response.status()
            )));
        }
        let reset: ResetResponse = response.json().await?;
        info!(game_id = %reset.game_id, "Game reset");
        Ok(reset.game_id)
    }

    /// Reports host liveness (host only).
    #[instrument(skip(self))]
    pub async fn heartbeat(&self) -> Result<(), TransportError> {
        let url = format!("{}/api/heartbeat", self.base_url);
        let response = self.admin_post(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "heartbeat refused (status {})",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fetches the host-only session view, join code included.
    #[instrument(skip(self))]
    pub async fn admin_session(&self) -> Result<AdminSessionResponse, TransportError> {
        let url = format!("{}/api/admin/session", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(key) = &self.admin_key {
            builder = builder.header(ADMIN_KEY_HEADER, key.as_str());
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "session view refused (status {})",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Fetches one ticket by id.
    #[instrument(skip(self))]
    pub async fn fetch_ticket(&self, id: &str) -> Result<Ticket, TransportError> {
        let url = format!("{}/api/tickets/{}", self.base_url, id);
        let response = self.client.get(&url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to fetch ticket");
            TransportError::from(e)
        })?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "ticket {} not found (status {})",
                id,
                response.status()
            )));
        }
        let ticket: Ticket = response.json().await?;
        debug!(ticket_id = %ticket.id, "Fetched ticket");
        Ok(ticket)
    }

    /// Generates tickets on the server, gated by the join code.
    #[instrument(skip(self, code), fields(owner = %owner, count))]
    pub async fn generate_tickets(
        &self,
        owner: &str,
        count: usize,
        code: &str,
        client_id: Option<&str>,
    ) -> Result<Vec<Ticket>, TransportError> {
        let url = format!("{}/api/tickets/generate", self.base_url);
        let request = GenerateTicketsRequest {
            owner: owner.to_string(),
            count,
            code: Some(code.to_string()),
            client_id: client_id.map(str::to_string),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Ticket generation refused");
            return Err(TransportError::new(format!(
                "ticket generation refused (status {status}): {body}"
            )));
        }
        let tickets: TicketsResponse = response.json().await?;
        info!(created = tickets.tickets.len(), "Tickets generated");
        Ok(tickets.tickets)
    }

    /// Reports this device as online; returns the current online count.
    #[instrument(skip(self))]
    pub async fn ping_presence(&self, client_id: &str) -> Result<usize, TransportError> {
        let url = format!("{}/api/presence/ping", self.base_url);
        let request = PresencePingRequest {
            client_id: client_id.to_string(),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "presence ping refused (status {})",
                response.status()
            )));
        }
        let presence: PresenceResponse = response.json().await?;
        debug!(online = presence.online, "Presence ping acknowledged");
        Ok(presence.online)
    }

    /// Fetches the server-computed win result for a ticket.
    #[instrument(skip(self))]
    pub async fn check_ticket(
        &self,
        id: &TicketId,
    ) -> Result<crate::game::WinResult, TransportError> {
        let url = format!("{}/api/tickets/{}/check", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DrawSource for HttpGameClient {
    #[instrument(skip(self))]
    async fn fetch_state(&self) -> Result<DrawSnapshot, TransportError> {
        let url = format!("{}/api/state", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            debug!(error = %e, "State poll failed");
            TransportError::from(e)
        })?;
        let snapshot: DrawSnapshot = response.json().await?;
        Ok(snapshot)
    }
}

#[async_trait]
impl ClaimTransport for HttpGameClient {
    #[instrument(skip(self), fields(game_id = %key.game_id, ticket_id = %key.ticket_id))]
    async fn submit_claim(
        &self,
        key: &ClaimKey,
        kind: ClaimKind,
    ) -> Result<ClaimAck, TransportError> {
        let url = format!("{}/api/claims", self.base_url);
        let request = ClaimRequest {
            game_id: key.game_id.clone(),
            ticket_id: key.ticket_id.clone(),
            kind,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let ack: ClaimResponse = response.json().await?;
        Ok(match ack.accepted {
            true => ClaimAck::Accepted,
            false => ClaimAck::Rejected(ack.reason.unwrap_or_else(|| {
                ClaimRejection::Other("server gave no rejection reason".to_string())
            })),
        })
    }
}
