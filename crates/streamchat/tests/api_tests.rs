//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{WIDGET_HTML, test_app, test_app_without_widget};

async fn get(app: &common::TestApp, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_chat_serves_widget_and_creates_session() {
    let app = test_app();

    let (status, body) = get(&app, "/chat?twitch=SomeStreamer&youtube=abc123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), WIDGET_HTML);

    assert_eq!(app.registry.len(), 1);
    let (_, body) = get(&app, "/health").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["sessions"], 1);
}

#[tokio::test]
async fn test_chat_reuses_session_for_same_channels() {
    let app = test_app();

    get(&app, "/chat?youtube=abc123&twitch=streamer").await;
    get(&app, "/chat?twitch=Streamer&youtube=abc123").await;
    assert_eq!(app.registry.len(), 1);

    get(&app, "/chat?twitch=streamer").await;
    assert_eq!(app.registry.len(), 2);
}

#[tokio::test]
async fn test_chat_without_channel_is_bad_request() {
    let app = test_app();

    for uri in ["/chat", "/chat?twitch=", "/chat?twitch=%20&youtube="] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["error"].as_str().unwrap().contains("source channel"));
    }
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_list_sessions() {
    let app = test_app();
    get(&app, "/chat?twitch=beta").await;
    get(&app, "/chat?twitch=alpha&youtube=vid").await;

    let (status, body) = get(&app, "/api/sessions").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["key"], "twitch:alpha,youtube:vid");
    assert_eq!(sessions[0]["channels"]["youtube"], "vid");
    assert_eq!(sessions[0]["stats"]["viewers"], 0);
    assert_eq!(sessions[1]["key"], "twitch:beta");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();
    let (status, body) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(json["error"].as_str().unwrap().contains("/nope"));
}

#[tokio::test]
async fn test_chat_without_widget_is_unavailable() {
    let app = test_app_without_widget();

    let (status, body) = get(&app, "/chat?twitch=streamer").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
    assert!(json["error"].as_str().unwrap().contains("chat.html"));
}
