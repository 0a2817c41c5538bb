mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use calibr::config::AppConfig;
use common::{build_test_app, build_test_app_with, send, seed_market};

#[tokio::test]
async fn test_health_check() {
    let app = build_test_app();

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_test_app();

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).is_ok());
}

#[tokio::test]
async fn test_bearer_token_enforced_when_configured() {
    let config = AppConfig {
        api_token: Some("secret".into()),
        ..AppConfig::default()
    };
    let app = build_test_app_with(config);

    let (status, _) = send(&app, "GET", "/api/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard")
                .header("authorization", "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Health stays public
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_market_upsert_and_fetch() {
    let app = build_test_app();
    seed_market(&app, "btc-100k", Some(0.42), true).await;

    let (status, json) = send(&app, "GET", "/api/markets/btc-100k", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["yesPrice"], 0.42);
    assert_eq!(json["data"]["isActive"], true);

    let (status, _) = send(&app, "GET", "/api/markets/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_market_price_out_of_range_rejected() {
    let app = build_test_app();
    let (status, json) = send(
        &app,
        "PUT",
        "/api/markets/bad",
        None,
        Some(json!({ "question": "?", "yesPrice": 1.5 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_reputation_for_unknown_user_is_zero() {
    let app = build_test_app();

    let (status, json) = send(&app, "GET", "/api/users/nobody/reputation", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["compositeScore"], 0);
    assert_eq!(json["data"]["tier"], "APPRENTICE");
    assert_eq!(json["data"]["nextTier"], "JOURNEYMAN");
}

#[tokio::test]
async fn test_calibration_update_promotes_and_celebrates() {
    let app = build_test_app();

    // Journeyman first: 100 forecasts, 10 resolved, brier 0.6 → 220 + 140 + 25 = 385
    let (status, json) = send(
        &app,
        "PUT",
        "/api/users/alice/calibration",
        None,
        Some(json!({
            "avgBrierScore": 0.6,
            "avgTimeWeightedBrier": 0.6,
            "totalForecasts": 100,
            "resolvedForecasts": 10,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["calibration"]["currentTier"], "JOURNEYMAN");
    assert_eq!(json["data"]["reputation"]["compositeScore"], 385);

    // Then the worked example: 760 → Master
    let (status, json) = send(
        &app,
        "PUT",
        "/api/users/alice/calibration",
        None,
        Some(json!({
            "avgBrierScore": 0.2,
            "avgTimeWeightedBrier": 0.18,
            "totalForecasts": 100,
            "resolvedForecasts": 80,
            "globalRank": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["reputation"]["compositeScore"], 760);
    assert_eq!(data["calibration"]["currentTier"], "MASTER");
    assert_eq!(data["tierChange"]["changed"], true);
    assert_eq!(data["tierChange"]["direction"], "up");
    assert_eq!(data["tierChange"]["delta"], 2);
    assert_eq!(data["tierChange"]["shouldCelebrate"], true);

    // Master band is 600..800
    let progress = data["reputation"]["tierProgress"].as_f64().unwrap();
    assert!((progress - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_calibration_demotion_not_celebrated() {
    let app = build_test_app();

    for (brier, total) in [(0.1, 100), (0.9, 120)] {
        let (status, json) = send(
            &app,
            "PUT",
            "/api/users/bob/calibration",
            None,
            Some(json!({
                "avgBrierScore": brier,
                "avgTimeWeightedBrier": brier,
                "totalForecasts": total,
                "resolvedForecasts": 60,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        if brier > 0.5 {
            assert_eq!(json["data"]["tierChange"]["direction"], "down");
            assert_eq!(json["data"]["tierChange"]["shouldCelebrate"], false);
        }
    }
}

#[tokio::test]
async fn test_calibration_counters_cannot_shrink() {
    let app = build_test_app();
    let body = |total: i32| {
        json!({ "avgBrierScore": 0.3, "totalForecasts": total, "resolvedForecasts": 5 })
    };

    let (status, _) = send(&app, "PUT", "/api/users/carol/calibration", None, Some(body(10))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "PUT", "/api/users/carol/calibration", None, Some(body(9))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_leaderboard_orders_by_score_then_rank() {
    let app = build_test_app();

    let users = [
        ("low", 0.4, Some(1)),
        ("high", 0.1, Some(5)),
        ("tied_ranked", 0.2, Some(2)),
        ("tied_unranked", 0.2, None),
    ];
    for (user, brier, rank) in users {
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/users/{user}/calibration"),
            None,
            Some(json!({
                "avgBrierScore": brier,
                "avgTimeWeightedBrier": brier,
                "totalForecasts": 100,
                "resolvedForecasts": 80,
                "globalRank": rank,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(&app, "GET", "/api/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["userId"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["high", "tied_ranked", "tied_unranked", "low"]);

    let (_, json) = send(&app, "GET", "/api/leaderboard?limit=2", None, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}
