// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use axum::{body::Body, http::Request, http::StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use super::support::*;

fn health_request() -> Request<Body> {
    Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_ok() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app.oneshot(health_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_does_not_load_model() {
    let loader = Arc::new(CountingLoader::failing_once(Arc::new(FixedDetector::new(
        vec![],
    ))));
    let app = router_with_loader(loader.clone());

    for _ in 0..3 {
        let response = app.clone().oneshot(health_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(loader.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let request = Request::builder()
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
