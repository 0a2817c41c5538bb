pub mod calibration_repo;
pub mod forecast_repo;
pub mod market_repo;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Forecast, Market, UserCalibration};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("concurrent write on forecast chain for user {user_id}, market {market_id}")]
    ConcurrentWrite { user_id: String, market_id: String },

    #[error("forecast {0} is already attested")]
    AlreadyAttested(Uuid),

    #[error("forecast {0} is attested and cannot be deleted")]
    ImmutableForecast(Uuid),

    #[error("forecast {0} is not the latest version")]
    NotChainHead(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only forecast storage.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Insert a new version. Succeeds only while the current chain head for
    /// the forecast's (user, market) is `expected_head`; otherwise
    /// [`StoreError::ConcurrentWrite`].
    async fn insert_forecast(&self, forecast: &Forecast, expected_head: Option<Uuid>) -> StoreResult<Forecast>;

    async fn get_forecast(&self, id: Uuid) -> StoreResult<Option<Forecast>>;

    /// Latest version for (user, market), if any.
    async fn current_forecast(&self, user_id: &str, market_id: &str) -> StoreResult<Option<Forecast>>;

    /// All versions for (user, market), newest first.
    async fn forecast_versions(&self, user_id: &str, market_id: &str) -> StoreResult<Vec<Forecast>>;

    /// Current version of every market the user has forecast, newest first.
    async fn user_forecasts(&self, user_id: &str) -> StoreResult<Vec<Forecast>>;

    /// Set the attestation pair exactly once.
    async fn record_attestation(&self, id: Uuid, uid: &str, attested_at: DateTime<Utc>) -> StoreResult<Forecast>;

    /// Delete an unattested chain head.
    async fn delete_forecast(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn upsert_market(&self, market: &Market) -> StoreResult<Market>;

    async fn get_market(&self, id: &str) -> StoreResult<Option<Market>>;
}

/// Calibration rows are written by the resolution pipeline and read by the scorer.
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    async fn get_calibration(&self, user_id: &str) -> StoreResult<Option<UserCalibration>>;

    async fn upsert_calibration(&self, calibration: &UserCalibration) -> StoreResult<UserCalibration>;

    async fn all_calibrations(&self) -> StoreResult<Vec<UserCalibration>>;
}

/// Everything the HTTP layer needs from storage.
#[async_trait]
pub trait Store: ForecastStore + MarketStore + CalibrationStore {
    async fn ping(&self) -> bool;
}

pub async fn init_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
