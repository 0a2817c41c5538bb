use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::Market;
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMarketRequest {
    pub question: String,
    pub yes_price: Option<f64>,
    pub no_price: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_price(name: &str, price: Option<f64>) -> Result<(), AppError> {
    match price {
        Some(p) if !(0.0..=1.0).contains(&p) => Err(AppError::Validation(format!(
            "{name} must be within [0, 1], got {p}"
        ))),
        _ => Ok(()),
    }
}

/// PUT /api/markets/{id}: insert or refresh a market from the sync job
pub async fn upsert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpsertMarketRequest>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    validate_price("yesPrice", body.yes_price)?;
    validate_price("noPrice", body.no_price)?;

    let market = state
        .store
        .upsert_market(&Market {
            id,
            question: body.question,
            yes_price: body.yes_price,
            no_price: body.no_price,
            is_active: body.is_active,
            updated_at: Utc::now(),
        })
        .await?;

    tracing::debug!(
        market_id = %market.id,
        yes_price = ?market.yes_price,
        is_active = market.is_active,
        "Market upserted"
    );

    Ok(Json(ApiResponse::ok(market)))
}

/// GET /api/markets/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    let market = state
        .store
        .get_market(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("market {id}")))?;

    Ok(Json(ApiResponse::ok(market)))
}
