//! HTTP API contract tests over the in-process router.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use bolillero::game::DrawSnapshot;
use bolillero::server::{
    ADMIN_KEY_HEADER, AppState, CheckAllResponse, ClaimResponse, MetricsResponse,
    PresenceResponse, TicketsResponse, router,
};
use bolillero::session::GameSession;
use bolillero::tickets::TicketStore;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ADMIN_KEY: &str = "test-admin-key";

fn app() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        session: GameSession::new(Duration::from_secs(35)),
        tickets: Arc::new(TicketStore::open(dir.path()).unwrap()),
        admin_key: Some(ADMIN_KEY.to_string()),
    };
    (router(state.clone()), state, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_admin(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(ADMIN_KEY_HEADER, ADMIN_KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn parse<T: DeserializeOwned>(body: serde_json::Value) -> T {
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_state_reflects_admin_draws() {
    let (app, _, _dir) = app();

    let (status, body) = send(&app, get("/api/state")).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: DrawSnapshot = parse(body);
    assert!(snapshot.drawn.is_empty());
    assert_eq!(snapshot.remaining, 90);

    let (status, _) = send(&app, post_admin("/api/draw")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/state")).await;
    let snapshot: DrawSnapshot = parse(body);
    assert_eq!(snapshot.drawn.len(), 1);
    assert_eq!(snapshot.last, Some(snapshot.drawn[0]));
    assert!(snapshot.host_online, "a draw counts as a heartbeat");
}

#[tokio::test]
async fn test_draw_requires_admin_key() {
    let (app, _, _dir) = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/draw")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ticket_generation_gated_by_join_code() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    let (status, body) = send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 2, "code": code }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tickets: TicketsResponse = parse(body);
    assert_eq!(tickets.tickets.len(), 2);

    let (status, _) = send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 1, "code": "000000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_generation_refused_once_game_started() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();
    send(&app, post_admin("/api/draw")).await;

    let (status, _) = send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 1, "code": code }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manual_ticket_rejects_bad_selection() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    // 3, 7, 9 overload column 0.
    let (status, _) = send(
        &app,
        post_json(
            "/api/tickets/manual",
            &serde_json::json!({
                "owner": "Ana",
                "code": code,
                "numbers": [3, 7, 9, 15, 23, 34, 39, 41, 47, 55, 62, 68, 71, 80, 90],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An empty column is fine for the authoritative engine.
    let (status, _) = send(
        &app,
        post_json(
            "/api/tickets/manual",
            &serde_json::json!({
                "owner": "Ana",
                "code": code,
                "numbers": [1, 5, 23, 29, 34, 39, 41, 47, 55, 59, 62, 68, 71, 79, 80],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_claim_flow_duplicate_and_stale() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    let (_, body) = send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 1, "code": code }),
        ),
    )
    .await;
    let tickets: TicketsResponse = parse(body);
    let ticket = &tickets.tickets[0];
    let game_id = state.session.game_id();

    // Draw until this ticket has a full house.
    loop {
        let drawn: std::collections::HashSet<u8> = state.session.drawn().into_iter().collect();
        if bolillero::evaluate(&ticket.grid, &drawn).full_house {
            break;
        }
        send(&app, post_admin("/api/draw")).await;
    }

    let claim = serde_json::json!({
        "game_id": game_id,
        "ticket_id": ticket.id,
        "kind": "full_house",
    });
    let (status, body) = send(&app, post_json("/api/claims", &claim)).await;
    assert_eq!(status, StatusCode::OK);
    let ack: ClaimResponse = parse(body);
    assert!(ack.accepted);

    let (_, body) = send(&app, post_json("/api/claims", &claim)).await;
    let ack: ClaimResponse = parse(body);
    assert!(!ack.accepted);

    // After a reset the old instance id is refused outright.
    send(&app, post_admin("/api/reset")).await;
    let (_, body) = send(&app, post_json("/api/claims", &claim)).await;
    let ack: ClaimResponse = parse(body);
    assert!(!ack.accepted);
}

#[tokio::test]
async fn test_presence_counts_devices_and_rejects_blank_ids() {
    let (app, _, _dir) = app();

    let (status, body) = send(
        &app,
        post_json("/api/presence/ping", &serde_json::json!({ "client_id": "device-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let presence: PresenceResponse = parse(body);
    assert_eq!(presence.online, 1);

    let (_, body) = send(
        &app,
        post_json("/api/presence/ping", &serde_json::json!({ "client_id": "device-b" })),
    )
    .await;
    let presence: PresenceResponse = parse(body);
    assert_eq!(presence.online, 2);

    let (status, _) = send(
        &app,
        post_json("/api/presence/ping", &serde_json::json!({ "client_id": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_reports_online_and_sold() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    send(
        &app,
        post_json("/api/presence/ping", &serde_json::json!({ "client_id": "device-a" })),
    )
    .await;
    send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 3, "code": code }),
        ),
    )
    .await;

    let (status, body) = send(&app, get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let metrics: MetricsResponse = parse(body);
    assert_eq!(metrics.online, 1);
    assert_eq!(metrics.sold, 3);
}

#[tokio::test]
async fn test_check_all_evaluates_every_ticket() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 2, "code": code }),
        ),
    )
    .await;
    send(&app, post_admin("/api/draw")).await;

    let (status, body) = send(&app, get("/api/tickets/check_all")).await;
    assert_eq!(status, StatusCode::OK);
    let all: CheckAllResponse = parse(body);
    assert_eq!(all.results.len(), 2);
    assert_eq!(all.drawn_count, 1);
    for standing in &all.results {
        assert_eq!(standing.result.total, 15);
        assert!(standing.result.marked <= 1);
        assert_eq!(standing.owner, "Ana");
    }
}

#[tokio::test]
async fn test_check_endpoint_reports_marks() {
    let (app, state, _dir) = app();
    let code = state.session.join_code();

    let (_, body) = send(
        &app,
        post_json(
            "/api/tickets/generate",
            &serde_json::json!({ "owner": "Ana", "count": 1, "code": code }),
        ),
    )
    .await;
    let tickets: TicketsResponse = parse(body);
    let id = &tickets.tickets[0].id;

    let (status, body) = send(&app, get(&format!("/api/tickets/{id}/check"))).await;
    assert_eq!(status, StatusCode::OK);
    let result: bolillero::WinResult = parse(body);
    assert_eq!(result.marked, 0);
    assert_eq!(result.total, 15);

    let (status, _) = send(&app, get("/api/tickets/NOPE0000/check")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
