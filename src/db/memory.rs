use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CalibrationStore, ForecastStore, MarketStore, Store, StoreError, StoreResult};
use crate::forecasting::ledger;
use crate::models::{Forecast, Market, UserCalibration};

#[derive(Default)]
struct Inner {
    forecasts: HashMap<Uuid, Forecast>,
    markets: HashMap<String, Market>,
    calibrations: HashMap<String, UserCalibration>,
}

impl Inner {
    fn versions(&self, user_id: &str, market_id: &str) -> Vec<Forecast> {
        let mut versions: Vec<Forecast> = self
            .forecasts
            .values()
            .filter(|f| f.user_id == user_id && f.market_id == market_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        versions
    }

    fn head(&self, user_id: &str, market_id: &str) -> Option<&Forecast> {
        self.forecasts
            .values()
            .filter(|f| f.user_id == user_id && f.market_id == market_id)
            .max_by_key(|f| f.created_at)
    }
}

/// Process-local store used when no `DATABASE_URL` is configured, and in tests.
///
/// A single write lock serializes head checks with inserts, which gives the
/// same one-head-per-chain guarantee as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForecastStore for MemoryStore {
    async fn insert_forecast(&self, forecast: &Forecast, expected_head: Option<Uuid>) -> StoreResult<Forecast> {
        let mut inner = self.inner.write().await;

        let head = inner.head(&forecast.user_id, &forecast.market_id).map(|f| f.id);
        if head != expected_head || forecast.previous_forecast_id != expected_head {
            return Err(StoreError::ConcurrentWrite {
                user_id: forecast.user_id.clone(),
                market_id: forecast.market_id.clone(),
            });
        }

        inner.forecasts.insert(forecast.id, forecast.clone());
        Ok(forecast.clone())
    }

    async fn get_forecast(&self, id: Uuid) -> StoreResult<Option<Forecast>> {
        Ok(self.inner.read().await.forecasts.get(&id).cloned())
    }

    async fn current_forecast(&self, user_id: &str, market_id: &str) -> StoreResult<Option<Forecast>> {
        Ok(self.inner.read().await.head(user_id, market_id).cloned())
    }

    async fn forecast_versions(&self, user_id: &str, market_id: &str) -> StoreResult<Vec<Forecast>> {
        Ok(self.inner.read().await.versions(user_id, market_id))
    }

    async fn user_forecasts(&self, user_id: &str) -> StoreResult<Vec<Forecast>> {
        let inner = self.inner.read().await;

        let mut heads: HashMap<&str, &Forecast> = HashMap::new();
        for f in inner.forecasts.values().filter(|f| f.user_id == user_id) {
            let entry = heads.entry(f.market_id.as_str()).or_insert(f);
            if f.created_at > entry.created_at {
                *entry = f;
            }
        }

        let mut heads: Vec<Forecast> = heads.into_values().cloned().collect();
        heads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(heads)
    }

    async fn record_attestation(&self, id: Uuid, uid: &str, attested_at: DateTime<Utc>) -> StoreResult<Forecast> {
        let mut inner = self.inner.write().await;
        let forecast = inner
            .forecasts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("forecast {id}")))?;

        *forecast = ledger::attest(forecast, uid, attested_at).map_err(|_| StoreError::AlreadyAttested(id))?;
        Ok(forecast.clone())
    }

    async fn delete_forecast(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let forecast = inner
            .forecasts
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("forecast {id}")))?;

        if forecast.is_attested() {
            return Err(StoreError::ImmutableForecast(id));
        }
        if inner.forecasts.values().any(|f| f.previous_forecast_id == Some(id)) {
            return Err(StoreError::NotChainHead(id));
        }

        inner.forecasts.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn upsert_market(&self, market: &Market) -> StoreResult<Market> {
        let stored = Market {
            updated_at: Utc::now(),
            ..market.clone()
        };
        self.inner
            .write()
            .await
            .markets
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_market(&self, id: &str) -> StoreResult<Option<Market>> {
        Ok(self.inner.read().await.markets.get(id).cloned())
    }
}

#[async_trait]
impl CalibrationStore for MemoryStore {
    async fn get_calibration(&self, user_id: &str) -> StoreResult<Option<UserCalibration>> {
        Ok(self.inner.read().await.calibrations.get(user_id).cloned())
    }

    async fn upsert_calibration(&self, calibration: &UserCalibration) -> StoreResult<UserCalibration> {
        let stored = UserCalibration {
            updated_at: Utc::now(),
            ..calibration.clone()
        };
        self.inner
            .write()
            .await
            .calibrations
            .insert(stored.user_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn all_calibrations(&self) -> StoreResult<Vec<UserCalibration>> {
        let mut rows: Vec<UserCalibration> =
            self.inner.read().await.calibrations.values().cloned().collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(rows)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastInput, MarketSnapshot};

    fn input(p: f64) -> ForecastInput {
        ForecastInput {
            user_id: "u1".into(),
            market_id: "m1".into(),
            probability: p,
            confidence: 0.5,
            kelly_fraction: 0.5,
            is_public: true,
        }
    }

    const OPEN: MarketSnapshot = MarketSnapshot {
        yes_price: Some(0.5),
        no_price: Some(0.5),
        is_active: true,
    };

    #[tokio::test]
    async fn test_stale_head_is_rejected() {
        let store = MemoryStore::new();
        let first = ledger::append(&input(0.6), &OPEN, None).unwrap().forecast;
        store.insert_forecast(&first, None).await.unwrap();

        // Two writers both read `first` as head
        let a = ledger::append(&input(0.7), &OPEN, Some(&first)).unwrap().forecast;
        let b = ledger::append(&input(0.8), &OPEN, Some(&first)).unwrap().forecast;

        store.insert_forecast(&a, Some(first.id)).await.unwrap();
        let err = store.insert_forecast(&b, Some(first.id)).await.unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentWrite { .. }));

        let head = store.current_forecast("u1", "m1").await.unwrap().unwrap();
        assert_eq!(head.id, a.id);
    }

    #[tokio::test]
    async fn test_second_root_is_rejected() {
        let store = MemoryStore::new();
        let a = ledger::append(&input(0.6), &OPEN, None).unwrap().forecast;
        let b = ledger::append(&input(0.7), &OPEN, None).unwrap().forecast;

        store.insert_forecast(&a, None).await.unwrap();
        assert!(store.insert_forecast(&b, None).await.is_err());
    }

    #[tokio::test]
    async fn test_attest_once_then_undeletable() {
        let store = MemoryStore::new();
        let f = ledger::append(&input(0.6), &OPEN, None).unwrap().forecast;
        store.insert_forecast(&f, None).await.unwrap();

        store.record_attestation(f.id, "0x01", Utc::now()).await.unwrap();
        let again = store.record_attestation(f.id, "0x02", Utc::now()).await.unwrap_err();
        assert!(matches!(again, StoreError::AlreadyAttested(_)));

        let del = store.delete_forecast(f.id).await.unwrap_err();
        assert!(matches!(del, StoreError::ImmutableForecast(_)));
        assert!(store.get_forecast(f.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_only_head_can_be_deleted() {
        let store = MemoryStore::new();
        let first = ledger::append(&input(0.6), &OPEN, None).unwrap().forecast;
        store.insert_forecast(&first, None).await.unwrap();
        let second = ledger::append(&input(0.7), &OPEN, Some(&first)).unwrap().forecast;
        store.insert_forecast(&second, Some(first.id)).await.unwrap();

        let err = store.delete_forecast(first.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotChainHead(_)));

        store.delete_forecast(second.id).await.unwrap();
        let head = store.current_forecast("u1", "m1").await.unwrap().unwrap();
        assert_eq!(head.id, first.id);
    }

    #[tokio::test]
    async fn test_user_forecasts_returns_heads_only() {
        let store = MemoryStore::new();
        let first = ledger::append(&input(0.6), &OPEN, None).unwrap().forecast;
        store.insert_forecast(&first, None).await.unwrap();
        let second = ledger::append(&input(0.7), &OPEN, Some(&first)).unwrap().forecast;
        store.insert_forecast(&second, Some(first.id)).await.unwrap();

        let mut other = input(0.4);
        other.market_id = "m2".into();
        let third = ledger::append(&other, &OPEN, None).unwrap().forecast;
        store.insert_forecast(&third, None).await.unwrap();

        let heads = store.user_forecasts("u1").await.unwrap();
        let ids: Vec<Uuid> = heads.iter().map(|f| f.id).collect();
        assert_eq!(heads.len(), 2);
        assert!(ids.contains(&second.id));
        assert!(ids.contains(&third.id));
        assert!(!ids.contains(&first.id));
    }
}
