// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! CORS policy: the dashboard origins are allowed with credentials, anything
//! else gets no CORS headers.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::sync::Arc;
use tower::ServiceExt;

use super::support::*;

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/infer")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-request-id")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_preflight_allowed_origin() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app.oneshot(preflight("http://localhost:5173")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "content-type,x-request-id"
    );
}

#[tokio::test]
async fn test_preflight_second_dev_origin() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app.oneshot(preflight("http://127.0.0.1:5173")).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://127.0.0.1:5173"
    );
}

#[tokio::test]
async fn test_preflight_disallowed_origin() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app.oneshot(preflight("http://evil.example")).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_simple_request_gets_origin_header() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}
