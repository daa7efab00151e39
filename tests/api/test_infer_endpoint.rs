// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /infer tests
//!
//! Drive the real router with hand-built multipart bodies and fake
//! detectors, covering the content-type gate, decoding failures and the
//! error mapping for detector failures.

use axum::{body::Body, http::Request, http::StatusCode};
use safevision_backend::api::AppState;
use safevision_backend::vision::DetectorProvider;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

use super::support::*;

#[tokio::test]
async fn test_infer_returns_detections() {
    let detector = Arc::new(FixedDetector::new(vec![person_detection()]));
    let app = router_with_detector(detector.clone());

    let response = app
        .oneshot(image_upload(Some("image/png"), &png_bytes(32, 24)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0]["label_id"], 1);
    assert_eq!(detections[0]["label"], "person");
    assert!((detections[0]["score"].as_f64().unwrap() - 0.98).abs() < 1e-6);
    assert_eq!(detections[0]["box"]["x_min"], 4.0);
    assert_eq!(detections[0]["box"]["y_min"], 2.0);
    assert_eq!(detections[0]["box"]["x_max"], 30.0);
    assert_eq!(detections[0]["box"]["y_max"], 20.0);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_infer_empty_when_nothing_detected() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app
        .oneshot(image_upload(Some("image/png"), &png_bytes(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"detections": []}));
}

#[tokio::test]
async fn test_non_image_content_type_returns_empty() {
    let loader = Arc::new(CountingLoader::new(Arc::new(FixedDetector::new(vec![
        person_detection(),
    ]))));
    let app = router_with_loader(loader.clone());

    // Valid PNG bytes, but declared as text: ignored without touching the model
    let response = app
        .oneshot(image_upload(Some("text/plain"), &png_bytes(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"detections": []}));
    assert_eq!(loader.call_count(), 0);
}

#[tokio::test]
async fn test_large_non_image_upload_returns_empty() {
    let loader = Arc::new(CountingLoader::new(Arc::new(FixedDetector::new(vec![
        person_detection(),
    ]))));
    let state = AppState::new(Arc::new(DetectorProvider::new(loader.clone())), 1024);
    let app = router_with_state(state);

    // 200 KiB of text, far beyond the upload limit and the multipart overhead
    let body = multipart_body("file", Some("text/plain"), &vec![b'a'; 200 * 1024]);
    let response = app
        .oneshot(chunked_infer_request(body, 1024))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"detections": []}));
    assert_eq!(loader.call_count(), 0);
}

#[tokio::test]
async fn test_large_image_upload_still_rejected() {
    let state = AppState::with_detector(Arc::new(FixedDetector::new(vec![])), 1024);
    let app = router_with_state(state);

    let body = multipart_body("file", Some("image/png"), &vec![0u8; 200 * 1024]);
    let response = app
        .oneshot(chunked_infer_request(body, 1024))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_content_type_returns_empty() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![person_detection()])));

    let response = app.oneshot(image_upload(None, b"whatever")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"detections": []}));
}

#[tokio::test]
async fn test_corrupt_image_is_decode_error() {
    let detector = Arc::new(FixedDetector::new(vec![person_detection()]));
    let app = router_with_detector(detector.clone());

    let response = app
        .oneshot(image_upload(Some("image/jpeg"), b"not really a jpeg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "decode_error");
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let response = app
        .oneshot(infer_request(multipart_body(
            "image",
            Some("image/png"),
            &png_bytes(4, 4),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "file");
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let request = Request::builder()
        .method("POST")
        .uri("/infer")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"file": "abc"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_oversized_upload() {
    let state = AppState::with_detector(Arc::new(FixedDetector::new(vec![])), 1024);
    let app = router_with_state(state);

    let response = app
        .oneshot(image_upload(Some("image/png"), &vec![0u8; 4096]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error_type"], "payload_too_large");
}

#[tokio::test]
async fn test_inference_failure_is_500() {
    let app = router_with_detector(Arc::new(FailingDetector));

    let response = app
        .oneshot(image_upload(Some("image/png"), &png_bytes(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "inference_error");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("execution provider crashed"));
}

#[tokio::test]
async fn test_model_loaded_once_across_requests() {
    let loader = Arc::new(CountingLoader::new(Arc::new(FixedDetector::new(vec![
        person_detection(),
    ]))));
    let app = router_with_loader(loader.clone());

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(image_upload(Some("image/png"), &png_bytes(8, 8)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(loader.call_count(), 1);
}

#[tokio::test]
async fn test_load_failure_is_503_then_retried() {
    let loader = Arc::new(CountingLoader::failing_once(Arc::new(FixedDetector::new(
        vec![person_detection()],
    ))));
    let app = router_with_loader(loader.clone());

    let response = app
        .clone()
        .oneshot(image_upload(Some("image/png"), &png_bytes(8, 8)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error_type"], "service_unavailable");

    let response = app
        .oneshot(image_upload(Some("image/png"), &png_bytes(8, 8)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["detections"][0]["label"], "person");
    assert_eq!(loader.call_count(), 2);
}

#[tokio::test]
async fn test_infer_requires_post() {
    let app = router_with_detector(Arc::new(FixedDetector::new(vec![])));

    let request = Request::builder()
        .uri("/infer")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
