use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    calibration_repo, forecast_repo, market_repo, CalibrationStore, ForecastStore, MarketStore,
    Store, StoreResult,
};
use crate::models::{Forecast, Market, UserCalibration};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastStore for PgStore {
    async fn insert_forecast(&self, forecast: &Forecast, expected_head: Option<Uuid>) -> StoreResult<Forecast> {
        forecast_repo::insert_forecast(&self.pool, forecast, expected_head).await
    }

    async fn get_forecast(&self, id: Uuid) -> StoreResult<Option<Forecast>> {
        forecast_repo::get_forecast(&self.pool, id).await
    }

    async fn current_forecast(&self, user_id: &str, market_id: &str) -> StoreResult<Option<Forecast>> {
        forecast_repo::get_current_forecast(&self.pool, user_id, market_id).await
    }

    async fn forecast_versions(&self, user_id: &str, market_id: &str) -> StoreResult<Vec<Forecast>> {
        forecast_repo::get_forecast_versions(&self.pool, user_id, market_id).await
    }

    async fn user_forecasts(&self, user_id: &str) -> StoreResult<Vec<Forecast>> {
        forecast_repo::get_user_forecasts(&self.pool, user_id).await
    }

    async fn record_attestation(&self, id: Uuid, uid: &str, attested_at: DateTime<Utc>) -> StoreResult<Forecast> {
        forecast_repo::record_attestation(&self.pool, id, uid, attested_at).await
    }

    async fn delete_forecast(&self, id: Uuid) -> StoreResult<()> {
        forecast_repo::delete_forecast(&self.pool, id).await
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn upsert_market(&self, market: &Market) -> StoreResult<Market> {
        market_repo::upsert_market(&self.pool, market).await
    }

    async fn get_market(&self, id: &str) -> StoreResult<Option<Market>> {
        market_repo::get_market(&self.pool, id).await
    }
}

#[async_trait]
impl CalibrationStore for PgStore {
    async fn get_calibration(&self, user_id: &str) -> StoreResult<Option<UserCalibration>> {
        calibration_repo::get_calibration(&self.pool, user_id).await
    }

    async fn upsert_calibration(&self, calibration: &UserCalibration) -> StoreResult<UserCalibration> {
        calibration_repo::upsert_calibration(&self.pool, calibration).await
    }

    async fn all_calibrations(&self) -> StoreResult<Vec<UserCalibration>> {
        calibration_repo::get_all_calibrations(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
