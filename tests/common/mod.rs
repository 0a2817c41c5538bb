use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use calibr::api::router::create_router;
use calibr::config::AppConfig;
use calibr::db::MemoryStore;
use calibr::AppState;

/// Router over a fresh in-memory store.
#[allow(dead_code)]
pub fn build_test_app() -> Router {
    build_test_app_with(AppConfig::default())
}

#[allow(dead_code)]
pub fn build_test_app_with(config: AppConfig) -> Router {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
        metrics_handle: calibr::metrics::detached_handle(),
    };
    create_router(state)
}

/// Send a request and decode the JSON body (Null for empty / non-JSON bodies).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Seed a market through the API.
#[allow(dead_code)]
pub async fn seed_market(app: &Router, id: &str, yes_price: Option<f64>, is_active: bool) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/api/markets/{id}"),
        None,
        Some(serde_json::json!({
            "question": format!("Will {id} resolve YES?"),
            "yesPrice": yes_price,
            "noPrice": yes_price.map(|p| 1.0 - p),
            "isActive": is_active,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "seeding market {id}");
}
