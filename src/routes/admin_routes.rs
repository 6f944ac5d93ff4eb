//! Administrator endpoints. Every handler requires the `admin` role.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::donation_routes::DonationList;
use crate::models::User;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Registers admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/donations", get(all_donations))
        .route("/stats", get(stats))
}

#[derive(Serialize)]
struct Stats {
    users: u64,
    donations: usize,
    total_amount_cents: i64,
}

fn require_admin(user: &User) -> Result<(), HTTPError> {
    if user.has_role("admin") {
        Ok(())
    } else {
        Err(HTTPError::new(StatusCode::FORBIDDEN, "Admin role required"))
    }
}

async fn all_donations(
    user: User,
    State(state): State<AppState>,
) -> Result<Json<DonationList>, HTTPError> {
    require_admin(&user)?;
    let donations = state
        .store
        .list_donations(None)
        .await
        .map_err(HTTPError::internal)?;
    Ok(Json(DonationList { donations }))
}

async fn stats(user: User, State(state): State<AppState>) -> Result<Json<Stats>, HTTPError> {
    require_admin(&user)?;
    let users = state.store.count_users().await.map_err(HTTPError::internal)?;
    let donations = state
        .store
        .list_donations(None)
        .await
        .map_err(HTTPError::internal)?;

    let total_amount_cents = donations
        .iter()
        .try_fold(0i64, |total, d| total.checked_add(d.amount_cents))
        .ok_or_else(|| HTTPError::internal("donation total overflows i64"))?;

    Ok(Json(Stats {
        users,
        donations: donations.len(),
        total_amount_cents,
    }))
}
