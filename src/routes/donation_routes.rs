//! Donation endpoints for the signed-in donor.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::models::{Donation, NewDonation, User};
use crate::state::AppState;
use crate::utils::http_helpers::{HTTPError, JsonOrForm};

/// Registers donation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_donations).post(create_donation))
}

#[derive(Serialize)]
pub(crate) struct DonationList {
    pub donations: Vec<Donation>,
}

async fn list_donations(
    user: User,
    State(state): State<AppState>,
) -> Result<Json<DonationList>, HTTPError> {
    let donations = state
        .store
        .list_donations(Some(&user.id))
        .await
        .map_err(HTTPError::internal)?;
    Ok(Json(DonationList { donations }))
}

async fn create_donation(
    user: User,
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<NewDonation>,
) -> Result<(StatusCode, Json<Donation>), HTTPError> {
    let donation = request
        .into_donation(&user.id)
        .map_err(|e| HTTPError::new(StatusCode::BAD_REQUEST, e))?;

    state
        .store
        .add_donation(&donation)
        .await
        .map_err(HTTPError::internal)?;

    info!(
        "User '{}' donated {} {}",
        user.username, donation.amount_cents, donation.currency
    );
    Ok((StatusCode::CREATED, Json(donation)))
}
