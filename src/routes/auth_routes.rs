//! Authentication endpoint handlers: register, login, logout, and "who am I".

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Session, User};
use crate::state::AppState;
use crate::utils::http_helpers::{session_token, HTTPError, JsonOrForm};
use crate::utils::password::{hash_password, verify_password};

/// Registers authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(current_user))
        // Older clients ask for the same thing under /user.
        .route("/user", get(current_user))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.config.session.cookie_name.clone(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.session.secure_cookie)
        .path("/")
        .build()
}

/// Issues a session for `user` and attaches it as a cookie.
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<AuthResponse>), HTTPError> {
    let session = Session::issue(&user.id, state.config.session.ttl_secs);
    state
        .store
        .add_session(&session)
        .await
        .map_err(HTTPError::internal)?;

    let jar = jar.add(session_cookie(state, session.token.clone()));
    Ok((
        jar,
        Json(AuthResponse {
            token: session.token,
            user,
        }),
    ))
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonOrForm(request): JsonOrForm<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), HTTPError> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(HTTPError::new(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
        ));
    }

    let roles = state
        .config
        .admin_usernames
        .iter()
        .any(|admin| admin == &username)
        .then(|| vec!["admin".to_string()]);
    let user = User::new(username, email, roles);
    let password_hash = hash_password(&request.password).map_err(HTTPError::internal)?;

    let created = state
        .store
        .create_user(&user, &password_hash)
        .await
        .map_err(HTTPError::internal)?;
    if !created {
        return Err(HTTPError::new(
            StatusCode::CONFLICT,
            "Username is already registered",
        ));
    }

    info!("Registered user '{}'", user.username);
    let (jar, body) = start_session(&state, jar, user).await?;
    Ok((StatusCode::CREATED, jar, body))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonOrForm(request): JsonOrForm<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), HTTPError> {
    let credentials = state
        .store
        .find_credentials(request.username.trim())
        .await
        .map_err(HTTPError::internal)?;

    let user = match credentials {
        Some((user, hash)) if verify_password(&request.password, &hash) => user,
        _ => {
            debug!("Failed login for '{}'", request.username);
            return Err(HTTPError::new(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            ));
        }
    };

    info!("User '{}' logged in", user.username);
    start_session(&state, jar, user).await
}

/// Ends the presented session, if any, and clears the cookie. Always succeeds.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), HTTPError> {
    let cookie_name = state.config.session.cookie_name.clone();
    if let Some(token) = session_token(&headers, &cookie_name) {
        state
            .store
            .delete_session(&token)
            .await
            .map_err(HTTPError::internal)?;
    }
    let jar = jar.remove(Cookie::build(cookie_name).path("/").build());
    Ok((StatusCode::NO_CONTENT, jar))
}

async fn current_user(user: User) -> Json<User> {
    Json(user)
}
