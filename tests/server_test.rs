//! Tests for the HTTP routes.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cathedral::{
    BroadcastHub, GameService, MemorySessionStore, PIECE_COUNT, ServerStatus, TerritoryStart,
    router,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    router(Arc::new(GameService::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(BroadcastHub::new()),
        TerritoryStart::ThirdMove,
    )))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    match json {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_pieces_returns_catalog() {
    let (status, body) = send(&app(), get("/pieces")).await;
    assert_eq!(status, StatusCode::OK);

    let shapes: Vec<Vec<Vec<bool>>> = serde_json::from_slice(&body).unwrap();
    assert_eq!(shapes.len(), PIECE_COUNT);
    assert_eq!(shapes[1], vec![vec![false; 3], vec![false, true, false], vec![false; 3]]);
}

#[tokio::test]
async fn test_player_ids_are_fresh() {
    let app = app();
    let (_, first) = send(&app, get("/id")).await;
    let (_, second) = send(&app, get("/id")).await;
    assert_eq!(first.len(), 32);
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_create_then_fetch_game() {
    let app = app();
    let (status, id) = send(&app, post("/games?uid=alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    let id = String::from_utf8(id).unwrap();
    assert_eq!(id.len(), 6);

    let (status, body) = send(&app, get(&format!("/games/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(snapshot["id"], id.as_str());
    assert_eq!(snapshot["creator_id"], "alice");
    assert_eq!(snapshot["started"], false);

    let (_, body) = send(&app, get("/status")).await;
    let status: ServerStatus = serde_json::from_slice(&body).unwrap();
    assert_eq!(status.active_games, 1);
}

#[tokio::test]
async fn test_start_without_players_conflicts() {
    let app = app();
    let (_, id) = send(&app, post("/games", None)).await;
    let id = String::from_utf8(id).unwrap();

    let (status, _) = send(&app, post(&format!("/games/{id}/start"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_place_in_unknown_game_is_not_found() {
    let body = serde_json::json!({
        "piece_id": 1,
        "position": { "x": 0, "y": 0 },
        "orientation": 0
    });
    let (status, body) = send(&app(), post("/games/NOPE42/place?uid=alice", Some(body))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("NOPE42"));
}

#[tokio::test]
async fn test_place_before_start_is_bad_request() {
    let app = app();
    let (_, id) = send(&app, post("/games", None)).await;
    let id = String::from_utf8(id).unwrap();
    let body = serde_json::json!({
        "piece_id": 1,
        "position": { "x": 0, "y": 0 }
    });

    let (status, _) = send(&app, post(&format!("/games/{id}/place?uid=alice"), Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_games() {
    let app = app();
    send(&app, post("/games", None)).await;
    let (status, body) = send(&app, get("/games")).await;
    assert_eq!(status, StatusCode::OK);
    let games: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(games.len(), 1);
}
