//! HTTP server exposing the shared game over a JSON API.
//!
//! One process hosts one game. The host role drives draws and resets through
//! admin-gated endpoints; participants poll `/api/state` and manage tickets.

use crate::claim::{ClaimAck, ClaimKind, ClaimRejection};
use crate::game::layout::{build_grid, random_grid};
use crate::game::{Ticket, TicketId, WinResult, evaluate};
use crate::session::{DrawReport, GameSession};
use crate::storage::StorageError;
use crate::tickets::TicketStore;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Header carrying the admin key for host-only endpoints.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Most tickets a single generate request may create.
pub const MAX_TICKETS_PER_REQUEST: usize = 20;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    /// The single shared game.
    pub session: GameSession,
    /// Ticket persistence.
    pub tickets: Arc<TicketStore>,
    /// Admin key; `None` disables the gate (local development).
    pub admin_key: Option<String>,
}

/// Request to generate random tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTicketsRequest {
    /// Owner display name.
    pub owner: String,
    /// How many tickets to create.
    pub count: usize,
    /// Join code; required unless the request carries the admin key.
    #[serde(default)]
    pub code: Option<String>,
    /// Creating device id, if the client reports one.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Request to build one ticket from a hand-picked selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTicketRequest {
    /// Owner display name.
    pub owner: String,
    /// The 15 chosen numbers.
    pub numbers: Vec<u8>,
    /// Join code; required unless the request carries the admin key.
    #[serde(default)]
    pub code: Option<String>,
    /// Creating device id, if the client reports one.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// A batch of tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketsResponse {
    /// The tickets, sorted by id.
    pub tickets: Vec<Ticket>,
}

/// A win claim from a participant device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Game-instance id the win was detected against.
    pub game_id: String,
    /// Winning ticket.
    pub ticket_id: TicketId,
    /// What is being claimed.
    pub kind: ClaimKind,
}

/// Server verdict on a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Whether the claim was registered.
    pub accepted: bool,
    /// Rejection reason when not accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ClaimRejection>,
}

/// Participant liveness ping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePingRequest {
    /// Opaque device id, as reported by the client.
    pub client_id: String,
}

/// Online count after a presence ping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Devices seen within the liveness TTL.
    pub online: usize,
}

/// Quick game summary: who is online and how many tickets are out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Devices seen within the liveness TTL.
    pub online: usize,
    /// Tickets currently persisted.
    pub sold: usize,
}

/// One ticket's standing in a check-all sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStanding {
    /// Ticket id.
    pub id: TicketId,
    /// Owner display name.
    pub owner: String,
    /// Win evaluation against the current drawn set.
    pub result: WinResult,
}

/// Every ticket evaluated against the current drawn set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAllResponse {
    /// Standings, in ticket-id order.
    pub results: Vec<TicketStanding>,
    /// Draws so far.
    pub drawn_count: usize,
}

/// Host-only session view: includes the join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSessionResponse {
    /// Game-instance id.
    pub game_id: String,
    /// Join code for ticket creation.
    pub join_code: String,
    /// Draws so far.
    pub drawn: Vec<u8>,
    /// True once drawing has started.
    pub in_progress: bool,
}

/// Response to a reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// The new game-instance id.
    pub game_id: String,
}

/// API-level error, rendered as a JSON body with a matching status.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong admin key.
    Unauthorized,
    /// Wrong or missing join code, or the game already started.
    Forbidden(String),
    /// Unknown resource.
    NotFound(String),
    /// The request itself is invalid.
    BadRequest(String),
    /// The action conflicts with the game state.
    Conflict(String),
    /// Storage failure.
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "admin key required".to_string()),
            Self::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Storage(e) => {
                warn!(error = %e, "Storage failure serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage failure".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/draw", post(post_draw))
        .route("/api/reset", post(post_reset))
        .route("/api/heartbeat", post(post_heartbeat))
        .route("/api/presence/ping", post(presence_ping))
        .route("/api/metrics", get(get_metrics))
        .route("/api/admin/session", get(get_admin_session))
        .route("/api/tickets", get(list_tickets).delete(clear_tickets))
        .route("/api/tickets/check_all", get(check_all_tickets))
        .route("/api/tickets/generate", post(generate_tickets))
        .route("/api/tickets/manual", post(manual_ticket))
        .route("/api/tickets/{id}", get(get_ticket).delete(delete_ticket))
        .route("/api/tickets/{id}/check", get(check_ticket))
        .route("/api/claims", post(post_claim))
        .with_state(state)
}

fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    match &state.admin_key {
        None => true,
        Some(key) => headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == key),
    }
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if is_admin(state, headers) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Ticket creation is gated by the join code before the game starts; the
/// admin key bypasses both checks.
fn authorize_ticket_creation(
    state: &AppState,
    headers: &HeaderMap,
    code: Option<&str>,
) -> Result<(), ApiError> {
    if is_admin(state, headers) {
        return Ok(());
    }
    if state.session.in_progress() {
        return Err(ApiError::Forbidden(
            "the game has started; no new tickets".to_string(),
        ));
    }
    match code {
        Some(code) if state.session.verify_join_code(code) => Ok(()),
        _ => Err(ApiError::Forbidden("wrong or missing join code".to_string())),
    }
}

async fn get_state(State(state): State<AppState>) -> Json<crate::game::DrawSnapshot> {
    Json(state.session.snapshot())
}

#[instrument(skip_all)]
async fn post_draw(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DrawReport>, ApiError> {
    require_admin(&state, &headers)?;
    state
        .session
        .draw()
        .map(Json)
        .ok_or_else(|| ApiError::Conflict("all 90 numbers have been drawn".to_string()))
}

#[instrument(skip_all)]
async fn post_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, ApiError> {
    require_admin(&state, &headers)?;
    let game_id = state.session.reset();
    Ok(Json(ResetResponse { game_id }))
}

async fn post_heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    state.session.heartbeat();
    Ok(StatusCode::NO_CONTENT)
}

async fn get_admin_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminSessionResponse>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(AdminSessionResponse {
        game_id: state.session.game_id(),
        join_code: state.session.join_code(),
        drawn: state.session.drawn(),
        in_progress: state.session.in_progress(),
    }))
}

async fn presence_ping(
    State(state): State<AppState>,
    Json(request): Json<PresencePingRequest>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let client_id = request.client_id.trim();
    if client_id.is_empty() || client_id.len() > 64 {
        return Err(ApiError::BadRequest(
            "client_id must be 1..=64 characters".to_string(),
        ));
    }
    let online = state.session.presence_ping(client_id);
    Ok(Json(PresenceResponse { online }))
}

async fn get_metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    Ok(Json(MetricsResponse {
        online: state.session.online_count(),
        sold: state.tickets.list()?.len(),
    }))
}

async fn check_all_tickets(
    State(state): State<AppState>,
) -> Result<Json<CheckAllResponse>, ApiError> {
    let drawn: std::collections::HashSet<u8> = state.session.drawn().into_iter().collect();
    let results = state
        .tickets
        .list()?
        .into_iter()
        .map(|ticket| TicketStanding {
            result: evaluate(&ticket.grid, &drawn),
            id: ticket.id,
            owner: ticket.owner,
        })
        .collect();
    Ok(Json(CheckAllResponse {
        results,
        drawn_count: drawn.len(),
    }))
}

async fn list_tickets(State(state): State<AppState>) -> Result<Json<TicketsResponse>, ApiError> {
    let tickets = state.tickets.list()?;
    Ok(Json(TicketsResponse { tickets }))
}

#[instrument(skip_all)]
async fn clear_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    let removed = state.tickets.clear()?;
    info!(removed, "Tickets cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(owner = %request.owner, count = request.count))]
async fn generate_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateTicketsRequest>,
) -> Result<(StatusCode, Json<TicketsResponse>), ApiError> {
    authorize_ticket_creation(&state, &headers, request.code.as_deref())?;
    if request.count == 0 || request.count > MAX_TICKETS_PER_REQUEST {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_TICKETS_PER_REQUEST}"
        )));
    }
    if request.owner.trim().is_empty() {
        return Err(ApiError::BadRequest("owner must not be empty".to_string()));
    }

    let mut rng = rand::thread_rng();
    let mut tickets = Vec::with_capacity(request.count);
    for _ in 0..request.count {
        let grid = random_grid(&mut rng);
        let mut ticket = Ticket::new(&mut rng, request.owner.trim(), grid);
        if let Some(client_id) = &request.client_id {
            ticket = ticket.with_client_id(client_id);
        }
        state.tickets.save(&ticket)?;
        tickets.push(ticket);
    }
    info!(created = tickets.len(), "Tickets generated");
    Ok((StatusCode::CREATED, Json(TicketsResponse { tickets })))
}

#[instrument(skip_all, fields(owner = %request.owner))]
async fn manual_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ManualTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    authorize_ticket_creation(&state, &headers, request.code.as_deref())?;
    if request.owner.trim().is_empty() {
        return Err(ApiError::BadRequest("owner must not be empty".to_string()));
    }
    let grid = build_grid(&request.numbers).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let mut ticket = Ticket::new(&mut rand::thread_rng(), request.owner.trim(), grid);
    if let Some(client_id) = &request.client_id {
        ticket = ticket.with_client_id(client_id);
    }
    state.tickets.save(&ticket)?;
    info!(ticket_id = %ticket.id, "Manual ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    state
        .tickets
        .load(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no ticket {id}")))
}

async fn check_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WinResult>, ApiError> {
    let ticket = state
        .tickets
        .load(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("no ticket {id}")))?;
    let drawn = state.session.drawn().into_iter().collect();
    Ok(Json(evaluate(&ticket.grid, &drawn)))
}

#[instrument(skip_all)]
async fn delete_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    state.tickets.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(game_id = %request.game_id, ticket_id = %request.ticket_id, kind = %request.kind))]
async fn post_claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let ticket = state
        .tickets
        .load(&request.ticket_id)?
        .ok_or_else(|| ApiError::NotFound(format!("no ticket {}", request.ticket_id)))?;
    let drawn = state.session.drawn().into_iter().collect();
    let result = evaluate(&ticket.grid, &drawn);

    let ack = state
        .session
        .register_claim(&request.game_id, &ticket.id, request.kind, &result);
    Ok(Json(match ack {
        ClaimAck::Accepted => ClaimResponse {
            accepted: true,
            reason: None,
        },
        ClaimAck::Rejected(reason) => ClaimResponse {
            accepted: false,
            reason: Some(reason),
        },
    }))
}

/// Serves the API until the task is cancelled.
#[instrument(skip(state), fields(%addr))]
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_state(admin_key: Option<&str>) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            session: GameSession::new(Duration::from_secs(35)),
            tickets: Arc::new(TicketStore::open(dir.path()).unwrap()),
            admin_key: admin_key.map(str::to_string),
        };
        (state, dir)
    }

    #[test]
    fn test_admin_gate() {
        let (state, _dir) = test_state(Some("secret"));
        let mut headers = HeaderMap::new();
        assert!(require_admin(&state, &headers).is_err());
        headers.insert(ADMIN_KEY_HEADER, "wrong".parse().unwrap());
        assert!(require_admin(&state, &headers).is_err());
        headers.insert(ADMIN_KEY_HEADER, "secret".parse().unwrap());
        assert!(require_admin(&state, &headers).is_ok());
    }

    #[test]
    fn test_admin_gate_disabled_without_key() {
        let (state, _dir) = test_state(None);
        assert!(require_admin(&state, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_ticket_creation_requires_code_before_start() {
        let (state, _dir) = test_state(Some("secret"));
        let headers = HeaderMap::new();
        let code = state.session.join_code();

        assert!(authorize_ticket_creation(&state, &headers, Some(&code)).is_ok());
        assert!(authorize_ticket_creation(&state, &headers, Some("000000")).is_err());
        assert!(authorize_ticket_creation(&state, &headers, None).is_err());
    }

    #[test]
    fn test_ticket_creation_refused_once_started() {
        let (state, _dir) = test_state(Some("secret"));
        let code = state.session.join_code();
        state.session.draw();
        assert!(authorize_ticket_creation(&state, &HeaderMap::new(), Some(&code)).is_err());

        // The admin key bypasses the started-game refusal.
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, "secret".parse().unwrap());
        assert!(authorize_ticket_creation(&state, &headers, None).is_ok());
    }
}
