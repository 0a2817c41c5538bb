use sqlx::PgPool;

use super::StoreResult;
use crate::models::Market;

/// Insert or refresh a market row from the sync job.
pub async fn upsert_market(pool: &PgPool, market: &Market) -> StoreResult<Market> {
    let row = sqlx::query_as::<_, Market>(
        r#"
        INSERT INTO markets (id, question, yes_price, no_price, is_active, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (id) DO UPDATE
            SET question = $2, yes_price = $3, no_price = $4, is_active = $5, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&market.id)
    .bind(&market.question)
    .bind(market.yes_price)
    .bind(market.no_price)
    .bind(market.is_active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_market(pool: &PgPool, id: &str) -> StoreResult<Option<Market>> {
    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(market)
}
