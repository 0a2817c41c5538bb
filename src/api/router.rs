use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Markets (written by the sync job)
        .route("/api/markets/:id", get(handlers::markets::detail).put(handlers::markets::upsert))
        // Forecasts
        .route("/api/forecasts", post(handlers::forecasts::create))
        .route(
            "/api/forecasts/:id",
            get(handlers::forecasts::detail)
                .put(handlers::forecasts::update)
                .delete(handlers::forecasts::remove),
        )
        .route("/api/forecasts/:id/history", get(handlers::forecasts::history))
        .route("/api/forecasts/:id/attestation", post(handlers::forecasts::attest))
        // Users
        .route("/api/users/:user_id/forecasts", get(handlers::users::forecasts))
        .route("/api/users/:user_id/reputation", get(handlers::users::reputation))
        .route("/api/users/:user_id/calibration", put(handlers::users::update_calibration))
        // Leaderboard
        .route("/api/leaderboard", get(handlers::leaderboard::list))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
