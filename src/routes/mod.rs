//! HTTP route definitions and the middleware stack around them.
//!
//! Everything lives under `/api`: health, auth, donations and admin. The `/api`
//! router is rate limited per client IP; security headers, CORS, body limits,
//! request tracing and panic recovery wrap the whole application.

mod admin_routes;
mod auth_routes;
mod donation_routes;
mod health_routes;

use std::any::Any;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ServerConfig;
use crate::rate_limit::rate_limit;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Headers set on every response unless a handler already set them.
const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("cross-origin-opener-policy", "same-origin"),
    ("x-dns-prefetch-control", "off"),
];

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    // Unknown /api paths answer from inside the limited router so they count too.
    let api = Router::new()
        .merge(health_routes::routes())
        .nest("/auth", auth_routes::routes())
        .nest("/donations", donation_routes::routes())
        .nest("/admin", admin_routes::routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let app = Router::new().nest("/api", api).fallback(not_found);
    with_middleware(app, &state.config).with_state(state)
}

/// Wraps `app` in the application-wide layers. Security headers sit outermost
/// so that panic responses carry them as well.
fn with_middleware(app: Router<AppState>, config: &ServerConfig) -> Router<AppState> {
    let mut app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(cors_layer(config))
            .layer(DefaultBodyLimit::max(config.body_limit_bytes)),
    );
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app
}

/// CORS for the browser client: one origin, credentials allowed.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match HeaderValue::from_str(&config.client_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            error!(
                "Invalid client_url '{}' ({}); cross-origin requests will be refused",
                config.client_url, e
            );
            cors
        }
    }
}

async fn not_found(OriginalUri(uri): OriginalUri) -> HTTPError {
    HTTPError::new(
        StatusCode::NOT_FOUND,
        format!("Route {} not found", uri.path()),
    )
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
