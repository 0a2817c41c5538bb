use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::models::Forecast;

/// Insert a new forecast version, guarded on the current chain head.
///
/// The head row is locked for the duration of the transaction. The unique
/// indexes on `previous_forecast_id` and on the chain root catch the case
/// where two writers race with no head to lock.
pub async fn insert_forecast(
    pool: &PgPool,
    forecast: &Forecast,
    expected_head: Option<Uuid>,
) -> StoreResult<Forecast> {
    let conflict = || StoreError::ConcurrentWrite {
        user_id: forecast.user_id.clone(),
        market_id: forecast.market_id.clone(),
    };

    let mut tx = pool.begin().await?;

    let head: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM forecasts
        WHERE user_id = $1 AND market_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(&forecast.user_id)
    .bind(&forecast.market_id)
    .fetch_optional(&mut *tx)
    .await?;

    if head.map(|h| h.0) != expected_head {
        return Err(conflict());
    }

    let inserted = sqlx::query_as::<_, Forecast>(
        r#"
        INSERT INTO forecasts (
            id, user_id, market_id, probability, confidence, kelly_fraction,
            recommended_size, market_yes_price, market_no_price,
            previous_forecast_id, is_public, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(forecast.id)
    .bind(&forecast.user_id)
    .bind(&forecast.market_id)
    .bind(forecast.probability)
    .bind(forecast.confidence)
    .bind(forecast.kelly_fraction)
    .bind(forecast.recommended_size)
    .bind(forecast.market_yes_price)
    .bind(forecast.market_no_price)
    .bind(forecast.previous_forecast_id)
    .bind(forecast.is_public)
    .bind(forecast.created_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            conflict()
        } else {
            StoreError::Database(e)
        }
    })?;

    tx.commit().await?;

    Ok(inserted)
}

pub async fn get_forecast(pool: &PgPool, id: Uuid) -> StoreResult<Option<Forecast>> {
    let forecast = sqlx::query_as::<_, Forecast>("SELECT * FROM forecasts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(forecast)
}

pub async fn get_current_forecast(
    pool: &PgPool,
    user_id: &str,
    market_id: &str,
) -> StoreResult<Option<Forecast>> {
    let forecast = sqlx::query_as::<_, Forecast>(
        r#"
        SELECT * FROM forecasts
        WHERE user_id = $1 AND market_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(market_id)
    .fetch_optional(pool)
    .await?;

    Ok(forecast)
}

pub async fn get_forecast_versions(
    pool: &PgPool,
    user_id: &str,
    market_id: &str,
) -> StoreResult<Vec<Forecast>> {
    let versions = sqlx::query_as::<_, Forecast>(
        "SELECT * FROM forecasts WHERE user_id = $1 AND market_id = $2 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(market_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

pub async fn get_user_forecasts(pool: &PgPool, user_id: &str) -> StoreResult<Vec<Forecast>> {
    let heads = sqlx::query_as::<_, Forecast>(
        r#"
        SELECT * FROM (
            SELECT DISTINCT ON (market_id) *
            FROM forecasts
            WHERE user_id = $1
            ORDER BY market_id, created_at DESC
        ) heads
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(heads)
}

/// Conditional update: only rows without an attestation are touched.
pub async fn record_attestation(
    pool: &PgPool,
    id: Uuid,
    uid: &str,
    attested_at: DateTime<Utc>,
) -> StoreResult<Forecast> {
    let updated = sqlx::query_as::<_, Forecast>(
        r#"
        UPDATE forecasts
        SET eas_attestation_uid = $2, eas_attested_at = $3
        WHERE id = $1 AND eas_attestation_uid IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(uid)
    .bind(attested_at)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(forecast) => Ok(forecast),
        None => match get_forecast(pool, id).await? {
            Some(_) => Err(StoreError::AlreadyAttested(id)),
            None => Err(StoreError::NotFound(format!("forecast {id}"))),
        },
    }
}

pub async fn delete_forecast(pool: &PgPool, id: Uuid) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, Forecast>("SELECT * FROM forecasts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("forecast {id}")))?;

    if row.is_attested() {
        return Err(StoreError::ImmutableForecast(id));
    }

    let (has_successor,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM forecasts WHERE previous_forecast_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

    if has_successor {
        return Err(StoreError::NotChainHead(id));
    }

    sqlx::query("DELETE FROM forecasts WHERE id = $1 AND eas_attestation_uid IS NULL")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
