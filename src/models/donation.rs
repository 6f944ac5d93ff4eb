use chrono::Utc;
use serde::{Deserialize, Serialize};

const DEFAULT_CURRENCY: &str = "USD";

/// Largest single donation accepted, in cents.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// A recorded donation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Donation {
    pub id: String,
    pub user_id: String,
    /// Amount in the smallest currency unit.
    pub amount_cents: i64,
    pub currency: String,
    pub message: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

/// Body of `POST /api/donations`.
#[derive(Deserialize, Debug, Clone)]
pub struct NewDonation {
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewDonation {
    /// Turns the request into a donation owned by `user_id`.
    pub fn into_donation(self, user_id: &str) -> Result<Donation, String> {
        if self.amount_cents <= 0 {
            return Err("Donation amount must be positive".to_string());
        }
        if self.amount_cents > MAX_AMOUNT_CENTS {
            return Err(format!(
                "Donation amount must not exceed {} cents",
                MAX_AMOUNT_CENTS
            ));
        }
        let currency = self
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(Donation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount_cents: self.amount_cents,
            currency,
            message,
            created_at: Utc::now().timestamp(),
        })
    }
}
