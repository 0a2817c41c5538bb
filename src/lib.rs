pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod forecasting;
pub mod metrics;
pub mod models;
pub mod reputation;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
