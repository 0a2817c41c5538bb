use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Market row as maintained by the external market-sync job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub question: String,
    pub yes_price: Option<f64>,
    pub no_price: Option<f64>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            yes_price: self.yes_price,
            no_price: self.no_price,
            is_active: self.is_active,
        }
    }
}

/// Prices and trading status captured at the instant a forecast is written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub yes_price: Option<f64>,
    pub no_price: Option<f64>,
    pub is_active: bool,
}
