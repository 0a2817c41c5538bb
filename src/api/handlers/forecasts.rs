use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::{AuthedUser, Caller};
use crate::db::StoreError;
use crate::errors::AppError;
use crate::forecasting::ledger;
use crate::forecasting::position_sizer::DEFAULT_KELLY_FRACTION;
use crate::forecasting::Calculated;
use crate::models::{Forecast, ForecastInput};
use crate::AppState;

use super::ApiResponse;

const DEFAULT_CONFIDENCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateForecastRequest {
    pub market_id: String,
    pub probability: f64,
    pub confidence: Option<f64>,
    pub kelly_fraction: Option<f64>,
    pub is_public: Option<bool>,
}

/// Omitted fields carry over from the current version.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateForecastRequest {
    pub probability: f64,
    pub confidence: Option<f64>,
    pub kelly_fraction: Option<f64>,
    pub is_public: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestRequest {
    pub uid: String,
    pub attested_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastWrite {
    pub forecast: Forecast,
    pub calculated: Calculated,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &ForecastInput) -> Result<(), AppError> {
    if !(input.probability > 0.0 && input.probability < 1.0) {
        return Err(AppError::Validation(format!(
            "probability must be strictly between 0 and 1, got {}",
            input.probability
        )));
    }
    if !(0.0..=1.0).contains(&input.confidence) {
        return Err(AppError::Validation(format!(
            "confidence must be within [0, 1], got {}",
            input.confidence
        )));
    }
    if !(0.0..=1.0).contains(&input.kelly_fraction) {
        return Err(AppError::Validation(format!(
            "kellyFraction must be within [0, 1], got {}",
            input.kelly_fraction
        )));
    }
    Ok(())
}

async fn load_forecast(state: &AppState, id: Uuid) -> Result<Forecast, AppError> {
    state
        .store
        .get_forecast(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forecast {id}")))
}

/// Load a forecast for a write by `user_id`. Private forecasts of other
/// users read as missing, public ones as forbidden.
async fn load_owned(state: &AppState, id: Uuid, user_id: &str) -> Result<Forecast, AppError> {
    let forecast = load_forecast(state, id).await?;
    if !forecast.visible_to(Some(user_id)) {
        return Err(AppError::NotFound(format!("forecast {id}")));
    }
    if forecast.user_id != user_id {
        return Err(AppError::Forbidden(format!("forecast {id} belongs to another user")));
    }
    Ok(forecast)
}

/// Append a version onto the current chain head and persist it.
async fn record_version(
    state: &AppState,
    input: ForecastInput,
    head: Option<Forecast>,
) -> Result<ForecastWrite, AppError> {
    validate_input(&input)?;

    let market = state
        .store
        .get_market(&input.market_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("market {}", input.market_id)))?;

    if !market.is_active {
        return Err(AppError::InactiveMarket(market.id));
    }

    let appended = ledger::append(&input, &market.snapshot(), head.as_ref())?;
    let expected_head = head.as_ref().map(|h| h.id);

    let stored = match state.store.insert_forecast(&appended.forecast, expected_head).await {
        Ok(f) => f,
        Err(e @ StoreError::ConcurrentWrite { .. }) => {
            counter!("concurrent_write_conflicts_total").increment(1);
            tracing::warn!(
                user_id = %input.user_id,
                market_id = %input.market_id,
                "Forecast chain head moved during write"
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if stored.previous_forecast_id.is_some() {
        counter!("forecast_versions_total").increment(1);
    } else {
        counter!("forecasts_created_total").increment(1);
    }

    tracing::info!(
        forecast_id = %stored.id,
        user_id = %stored.user_id,
        market_id = %stored.market_id,
        probability = stored.probability,
        edge = appended.calculated.edge,
        recommended_size = ?appended.calculated.recommended_size,
        "Forecast recorded"
    );

    Ok(ForecastWrite {
        forecast: stored,
        calculated: appended.calculated,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/forecasts: new forecast; chains onto any existing one for the market
pub async fn create(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Json(body): Json<CreateForecastRequest>,
) -> Result<Json<ApiResponse<ForecastWrite>>, AppError> {
    let head = state.store.current_forecast(&user_id, &body.market_id).await?;

    let input = ForecastInput {
        user_id,
        market_id: body.market_id,
        probability: body.probability,
        confidence: body.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        kelly_fraction: body.kelly_fraction.unwrap_or(DEFAULT_KELLY_FRACTION),
        is_public: body.is_public.unwrap_or(true),
    };

    let written = record_version(&state, input, head).await?;
    Ok(Json(ApiResponse::ok(written)))
}

/// PUT /api/forecasts/{id}: revise; the new version always follows the latest one
pub async fn update(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateForecastRequest>,
) -> Result<Json<ApiResponse<ForecastWrite>>, AppError> {
    let existing = load_owned(&state, id, &user_id).await?;

    let head = state
        .store
        .current_forecast(&existing.user_id, &existing.market_id)
        .await?
        .unwrap_or(existing);

    let input = ForecastInput {
        user_id,
        market_id: head.market_id.clone(),
        probability: body.probability,
        confidence: body.confidence.unwrap_or(head.confidence),
        kelly_fraction: body.kelly_fraction.unwrap_or(head.kelly_fraction),
        is_public: body.is_public.unwrap_or(head.is_public),
    };

    let written = record_version(&state, input, Some(head)).await?;
    Ok(Json(ApiResponse::ok(written)))
}

/// GET /api/forecasts/{id}
pub async fn detail(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Forecast>>, AppError> {
    let forecast = load_forecast(&state, id).await?;
    if !forecast.visible_to(caller.as_deref()) {
        return Err(AppError::NotFound(format!("forecast {id}")));
    }

    Ok(Json(ApiResponse::ok(forecast)))
}

/// GET /api/forecasts/{id}/history: this version and all earlier ones, newest first
pub async fn history(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Forecast>>>, AppError> {
    let forecast = load_forecast(&state, id).await?;
    if !forecast.visible_to(caller.as_deref()) {
        return Err(AppError::NotFound(format!("forecast {id}")));
    }

    let versions = state
        .store
        .forecast_versions(&forecast.user_id, &forecast.market_id)
        .await?;
    let chain = ledger::chain_from(id, &versions)?
        .into_iter()
        .filter(|f| f.visible_to(caller.as_deref()))
        .collect();

    Ok(Json(ApiResponse::ok(chain)))
}

/// DELETE /api/forecasts/{id}: attested forecasts are permanent
pub async fn remove(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let forecast = load_owned(&state, id, &user_id).await?;
    ledger::ensure_deletable(&forecast)?;

    state.store.delete_forecast(id).await?;
    counter!("forecasts_deleted_total").increment(1);
    tracing::info!(forecast_id = %id, user_id = %user_id, "Forecast deleted");

    Ok(Json(ApiResponse::ok(())))
}

/// POST /api/forecasts/{id}/attestation: record the on-chain attestation, once
pub async fn attest(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AttestRequest>,
) -> Result<Json<ApiResponse<Forecast>>, AppError> {
    let uid = body.uid.trim();
    if uid.is_empty() {
        return Err(AppError::Validation("attestation uid must not be empty".into()));
    }

    let forecast = load_owned(&state, id, &user_id).await?;
    ledger::ensure_attestable(&forecast)?;

    let attested_at = body.attested_at.unwrap_or_else(Utc::now);

    let stored = state.store.record_attestation(id, uid, attested_at).await?;
    counter!("attestations_recorded_total").increment(1);
    tracing::info!(forecast_id = %id, uid = %uid, "Forecast attested");

    Ok(Json(ApiResponse::ok(stored)))
}
