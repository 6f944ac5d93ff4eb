mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use donation_tracker::client::{
    AuthSession, ClientConfig, HttpUserFetcher, MemoryTokenStore, SessionPhase, TokenStore,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceExt;

use common::*;

/// Serves a fresh app on an ephemeral port and returns its base URL.
async fn spawn_server() -> (String, axum::Router) {
    let (app, _state) = build_app(load_test_config()).await;
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind an ephemeral port");
    let addr = listener.local_addr().expect("local address");

    let served = app.clone();
    tokio::spawn(async move {
        axum::serve(
            listener,
            served.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("server should run");
    });

    (format!("http://{}", addr), app)
}

async fn register_token(app: &axum::Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/register",
            Method::POST,
            &json!({"username": username, "email": "x@example.com", "password": "pw"}),
        ))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

fn session_against(base: &str, tokens: Arc<MemoryTokenStore>) -> AuthSession {
    let config = ClientConfig {
        api_base_url: Some(base.to_string()),
        request_timeout_ms: 5_000,
        ..ClientConfig::default()
    };
    let fetcher = HttpUserFetcher::new(&config).expect("client should build");
    AuthSession::new(tokens, Arc::new(fetcher))
}

#[tokio::test]
async fn client_session_round_trip_against_server() {
    let (base, app) = spawn_server().await;
    let token = register_token(&app, "grace").await;

    let tokens = Arc::new(MemoryTokenStore::new());
    let session = session_against(&base, tokens.clone());
    session.mount().await;
    assert_eq!(session.state().phase, SessionPhase::Resolved);
    assert!(session.user().is_none());

    session.login(&token).await;
    let user = session.user().expect("login should resolve the user");
    assert_eq!(user.username, "grace");
    assert!(!session.loading());

    // A fresh session over the same storage restores the login.
    let restored = session_against(&base, tokens.clone());
    restored.mount().await;
    assert_eq!(restored.user().map(|u| u.username), Some("grace".to_string()));

    session.logout();
    assert!(session.user().is_none());
    assert_eq!(tokens.read().unwrap(), None);
    session.close();
    restored.close();
}

#[tokio::test]
async fn client_session_unknown_token_is_unauthenticated() {
    let (base, _app) = spawn_server().await;
    let session = session_against(&base, Arc::new(MemoryTokenStore::with_token("bogus")));

    session.mount().await;

    assert_eq!(session.state().phase, SessionPhase::Resolved);
    assert!(session.user().is_none());
}
