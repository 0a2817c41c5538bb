use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;
use crate::forecasting::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Market {0} is not active")]
    InactiveMarket(String),

    #[error("Forecast {0} is already attested")]
    AlreadyAttested(String),

    #[error("Forecast {0} is attested and cannot be deleted")]
    ImmutableForecast(String),

    #[error("Conflict: {0}")]
    ConcurrentWrite(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InactiveMarket(_)
            | AppError::AlreadyAttested(_)
            | AppError::ImmutableForecast(_)
            | AppError::ConcurrentWrite(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InactiveMarket(market) => AppError::InactiveMarket(market),
            LedgerError::AlreadyAttested(id) => AppError::AlreadyAttested(id.to_string()),
            LedgerError::ImmutableForecast(id) => AppError::ImmutableForecast(id.to_string()),
            broken @ LedgerError::BrokenChain { .. } => AppError::Internal(broken.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::ConcurrentWrite { user_id, market_id } => AppError::ConcurrentWrite(format!(
                "forecast chain for user {user_id} on market {market_id} changed concurrently"
            )),
            StoreError::AlreadyAttested(id) => AppError::AlreadyAttested(id.to_string()),
            StoreError::ImmutableForecast(id) => AppError::ImmutableForecast(id.to_string()),
            StoreError::NotChainHead(id) => AppError::Validation(format!(
                "forecast {id} has newer versions; only the latest version can be deleted"
            )),
            StoreError::Database(e) => AppError::Internal(e.into()),
        }
    }
}
