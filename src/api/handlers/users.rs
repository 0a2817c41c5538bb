use axum::extract::{Path, State};
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::{Forecast, UserCalibration};
use crate::reputation::{
    composite_score, detect_tier_change, score_user, Reputation, Tier, TierChange, TierDirection,
};
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Aggregates pushed by the resolution pipeline after forecasts resolve.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationUpdate {
    pub avg_brier_score: Option<f64>,
    pub avg_time_weighted_brier: Option<f64>,
    pub total_forecasts: i32,
    pub resolved_forecasts: i32,
    pub global_rank: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResult {
    pub calibration: UserCalibration,
    pub reputation: Reputation,
    pub tier_change: TierChange,
}

fn validate_update(update: &CalibrationUpdate, existing: &UserCalibration) -> Result<(), AppError> {
    for (name, value) in [
        ("avgBrierScore", update.avg_brier_score),
        ("avgTimeWeightedBrier", update.avg_time_weighted_brier),
    ] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(AppError::Validation(format!("{name} must be within [0, 1], got {v}")));
            }
        }
    }

    if update.resolved_forecasts < 0 || update.resolved_forecasts > update.total_forecasts {
        return Err(AppError::Validation(format!(
            "resolvedForecasts ({}) must be between 0 and totalForecasts ({})",
            update.resolved_forecasts, update.total_forecasts
        )));
    }

    // Counters only ever grow
    if update.total_forecasts < existing.total_forecasts
        || update.resolved_forecasts < existing.resolved_forecasts
    {
        return Err(AppError::Validation(format!(
            "forecast counters cannot decrease (stored total={}, resolved={})",
            existing.total_forecasts, existing.resolved_forecasts
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/users/{user_id}/forecasts: current version per market
pub async fn forecasts(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Forecast>>>, AppError> {
    let heads = state
        .store
        .user_forecasts(&user_id)
        .await?
        .into_iter()
        .filter(|f| f.visible_to(caller.as_deref()))
        .collect();

    Ok(Json(ApiResponse::ok(heads)))
}

/// GET /api/users/{user_id}/reputation
pub async fn reputation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Reputation>>, AppError> {
    let calibration = state
        .store
        .get_calibration(&user_id)
        .await?
        .unwrap_or_else(|| UserCalibration::new(user_id));

    Ok(Json(ApiResponse::ok(score_user(&calibration))))
}

/// PUT /api/users/{user_id}/calibration: store new aggregates and re-tier
pub async fn update_calibration(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<CalibrationUpdate>,
) -> Result<Json<ApiResponse<CalibrationResult>>, AppError> {
    let existing = state
        .store
        .get_calibration(&user_id)
        .await?
        .unwrap_or_else(|| UserCalibration::new(user_id.clone()));

    validate_update(&body, &existing)?;

    let score = composite_score(
        body.total_forecasts,
        body.resolved_forecasts,
        body.avg_brier_score,
        body.avg_time_weighted_brier,
    );
    let new_tier = Tier::for_score(score);
    let tier_change = detect_tier_change(existing.current_tier, new_tier);

    let calibration = state
        .store
        .upsert_calibration(&UserCalibration {
            avg_brier_score: body.avg_brier_score,
            avg_time_weighted_brier: body.avg_time_weighted_brier,
            total_forecasts: body.total_forecasts,
            resolved_forecasts: body.resolved_forecasts,
            current_tier: new_tier,
            global_rank: body.global_rank,
            ..existing.clone()
        })
        .await?;

    match tier_change.direction {
        TierDirection::Up => {
            counter!("tier_promotions_total").increment(1);
            tracing::info!(
                user_id = %user_id,
                from = %existing.current_tier,
                to = %new_tier,
                score,
                "Tier promotion"
            );
        }
        TierDirection::Down => {
            counter!("tier_demotions_total").increment(1);
            tracing::info!(
                user_id = %user_id,
                from = %existing.current_tier,
                to = %new_tier,
                score,
                "Tier demotion"
            );
        }
        TierDirection::Same => {}
    }

    let reputation = score_user(&calibration);

    Ok(Json(ApiResponse::ok(CalibrationResult {
        calibration,
        reputation,
        tier_change,
    })))
}
