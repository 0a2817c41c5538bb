use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::reputation::{rank_leaderboard, Reputation};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /api/leaderboard: users by composite score
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<Reputation>>>, AppError> {
    let max = state.config.leaderboard_limit;
    let limit = query.limit.unwrap_or(max).clamp(1, max.max(1));

    // TODO: push scoring into SQL once the calibration table outgrows a full scan
    let rows = state.store.all_calibrations().await?;
    let board = rank_leaderboard(&rows, limit);

    tracing::debug!(users = rows.len(), returned = board.len(), "Leaderboard computed");

    Ok(Json(ApiResponse::ok(board)))
}
