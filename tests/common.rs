#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use donation_tracker::config::{extract, ServerConfig};
use donation_tracker::startup;
use donation_tracker::state::AppState;
use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use serde_json::Value;

pub const TEST_CONFIG: &str = r#"
client_url: "http://localhost:3000"
admin_usernames:
  - root
rate_limit:
  max_requests: 100
  window_secs: 900
cleanup:
  enabled: false
logging:
  level: "debug"
  format: "json"
"#;

pub fn load_test_config() -> ServerConfig {
    let figment = Figment::from(Serialized::defaults(ServerConfig::default()))
        .merge(Yaml::string(TEST_CONFIG));
    extract(&figment).expect("Failed to parse test config YAML")
}

pub async fn build_app(config: ServerConfig) -> (Router, AppState) {
    startup::build_app(Arc::new(config))
        .await
        .expect("app should build against the memory store")
}

fn with_peer(mut request: Request<Body>, ip: IpAddr) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 0)));
    request
}

pub fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

pub fn build_request(path: &str, method: Method) -> Request<Body> {
    build_request_from(path, method, localhost())
}

pub fn build_request_from(path: &str, method: Method, ip: IpAddr) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request");
    with_peer(request, ip)
}

pub fn json_request(path: &str, method: Method, body: &Value) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request");
    with_peer(request, localhost())
}

pub fn request_with_bearer(path: &str, token: &str, method: Method) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("failed to build request");
    with_peer(request, localhost())
}

pub fn request_with_cookie(path: &str, token: &str, method: Method) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .expect("failed to build request");
    with_peer(request, localhost())
}

pub fn authed_json_request(path: &str, token: &str, body: &Value) -> Request<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .expect("failed to build request");
    with_peer(request, localhost())
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// The `set-cookie` header, if any.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
