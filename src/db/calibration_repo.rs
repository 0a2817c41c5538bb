use sqlx::PgPool;

use super::StoreResult;
use crate::models::UserCalibration;

pub async fn get_calibration(pool: &PgPool, user_id: &str) -> StoreResult<Option<UserCalibration>> {
    let row = sqlx::query_as::<_, UserCalibration>(
        "SELECT * FROM user_calibrations WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn upsert_calibration(
    pool: &PgPool,
    calibration: &UserCalibration,
) -> StoreResult<UserCalibration> {
    let row = sqlx::query_as::<_, UserCalibration>(
        r#"
        INSERT INTO user_calibrations (
            user_id, avg_brier_score, avg_time_weighted_brier,
            total_forecasts, resolved_forecasts, current_tier, global_rank, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (user_id) DO UPDATE
            SET avg_brier_score = $2,
                avg_time_weighted_brier = $3,
                total_forecasts = $4,
                resolved_forecasts = $5,
                current_tier = $6,
                global_rank = $7,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&calibration.user_id)
    .bind(calibration.avg_brier_score)
    .bind(calibration.avg_time_weighted_brier)
    .bind(calibration.total_forecasts)
    .bind(calibration.resolved_forecasts)
    .bind(calibration.current_tier.as_str())
    .bind(calibration.global_rank)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_all_calibrations(pool: &PgPool) -> StoreResult<Vec<UserCalibration>> {
    let rows = sqlx::query_as::<_, UserCalibration>(
        "SELECT * FROM user_calibrations ORDER BY user_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
