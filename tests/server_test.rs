use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use werewolf_server::{
    app,
    models::config::GameConfig,
    state::AppState,
    utils::test_setup::{setup_test_env, SeededRandom},
};

fn test_app() -> Router {
    setup_test_env();
    let state = AppState::with_config(GameConfig::default(), Arc::new(SeededRandom::new(8)));
    app::create_app_with_state(state)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_create_and_join() {
    let app = test_app();

    let (status, body) = post(&app, "/api/game/c1/create", json!({ "player_id": "alice" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "public");
    assert!(body["notice"]["body"].as_str().unwrap().contains("alice"));

    let (status, _) = post(&app, "/api/game/c1/join", json!({ "player_id": "bob" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/api/game/c1/join", json!({ "player_id": "bob" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already in the party"));

    let (status, body) = get(&app, "/api/game/c1/party").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "ephemeral");
    let listing = body["notice"]["body"].as_str().unwrap();
    assert!(listing.contains("1. alice (leader)"));
    assert!(listing.contains("2. bob"));

    let (status, body) = get(&app, "/api/game/c1/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "Joining");
    assert_eq!(body["party"], json!(["alice", "bob"]));
}

#[tokio::test]
async fn test_one_party_per_player() {
    let app = test_app();
    post(&app, "/api/game/c1/create", json!({ "player_id": "alice" })).await;

    let (status, _) = post(&app, "/api/game/c2/create", json!({ "player_id": "alice" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&app, "/api/game/c2/create", json!({ "player_id": "carol" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/api/game/c1/join", json!({ "player_id": "carol" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_guard_failures_map_to_statuses() {
    let app = test_app();

    let (status, _) = post(&app, "/api/game/c1/join", json!({ "player_id": "bob" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    post(&app, "/api/game/c1/create", json!({ "player_id": "alice" })).await;
    post(&app, "/api/game/c1/join", json!({ "player_id": "bob" })).await;

    let (status, _) = post(&app, "/api/game/c1/continue", json!({ "player_id": "bob" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = post(&app, "/api/game/c1/actions/vote-yes", json!({ "player_id": "bob" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nominate"));

    let (status, _) = post(
        &app,
        "/api/game/c1/actions/night",
        json!({ "player_id": "bob", "kind": "kill", "target": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_role_lookup() {
    let app = test_app();

    let (status, body) = get(&app, "/api/game/c1/roles/ice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["title"], "Ice Witch");

    let (status, _) = get(&app, "/api/game/c1/roles/dragon").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/game/c1/roles").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notice"]["body"].as_str().unwrap().contains("Werewolves"));
}

#[tokio::test]
async fn test_log_shows_group_messages() {
    let app = test_app();
    post(&app, "/api/game/c1/create", json!({ "player_id": "alice" })).await;

    let (status, body) = get(&app, "/api/game/c1/log?player_id=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some());

    let (status, body) = get(&app, "/api/game/unknown/log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
