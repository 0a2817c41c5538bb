use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the forecasts table.
///
/// Rows are immutable once created. A new version is a new row whose
/// `previous_forecast_id` points at the version it replaces. The only field
/// ever written after creation is the attestation pair, and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub id: Uuid,
    pub user_id: String,
    pub market_id: String,
    pub probability: f64,
    pub confidence: f64,
    pub kelly_fraction: f64,
    pub recommended_size: Option<f64>,
    pub market_yes_price: Option<f64>,
    pub market_no_price: Option<f64>,
    pub previous_forecast_id: Option<Uuid>,
    pub is_public: bool,
    pub eas_attestation_uid: Option<String>,
    pub eas_attested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Forecast {
    pub fn is_attested(&self) -> bool {
        self.eas_attestation_uid.is_some()
    }

    /// Owner can always see their own forecasts; everyone else only public ones.
    pub fn visible_to(&self, caller: Option<&str>) -> bool {
        self.is_public || caller == Some(self.user_id.as_str())
    }
}

/// Caller-supplied inputs for a new forecast version.
#[derive(Debug, Clone)]
pub struct ForecastInput {
    pub user_id: String,
    pub market_id: String,
    pub probability: f64,
    pub confidence: f64,
    pub kelly_fraction: f64,
    pub is_public: bool,
}
