use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::reputation::Tier;

/// Database row for user_calibrations table (one per user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserCalibration {
    pub user_id: String,
    pub avg_brier_score: Option<f64>,
    pub avg_time_weighted_brier: Option<f64>,
    pub total_forecasts: i32,
    pub resolved_forecasts: i32,
    #[sqlx(try_from = "String")]
    pub current_tier: Tier,
    pub global_rank: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl UserCalibration {
    /// Empty row for a user that has never had a forecast resolved.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            avg_brier_score: None,
            avg_time_weighted_brier: None,
            total_forecasts: 0,
            resolved_forecasts: 0,
            current_tier: Tier::Apprentice,
            global_rank: None,
            updated_at: Utc::now(),
        }
    }
}
