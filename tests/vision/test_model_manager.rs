// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detector provider and loader tests
//!
//! Verify that the DetectorProvider:
//! - Builds the detector once and hands out the same instance
//! - Serializes concurrent first calls onto a single load
//! - Stays empty after a failed load so later calls retry
//! - Resolves local model directories through the DETR loader

use async_trait::async_trait;
use image::RgbImage;
use safevision_backend::vision::{
    Detection, DetectorConfig, DetectorError, DetectorLoader, DetectorProvider, DetrLoader,
    DevicePreference, ModelSource, ObjectDetector,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct StubDetector;

impl ObjectDetector for StubDetector {
    fn predict(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        Ok(vec![])
    }

    fn confidence_threshold(&self) -> f32 {
        0.7
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Loader that takes a while, so concurrent callers overlap
struct SlowLoader {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl SlowLoader {
    fn new(failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl DetectorLoader for SlowLoader {
    async fn load(&self) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(DetectorError::ModelLoad("weights corrupted".to_string()));
        }
        Ok(Arc::new(StubDetector))
    }
}

// =============================================================================
// DetectorProvider Tests
// =============================================================================

/// Test 1: Concurrent first calls trigger exactly one load
#[tokio::test]
async fn test_concurrent_first_use_single_load() {
    let loader = Arc::new(SlowLoader::new(0));
    let provider = Arc::new(DetectorProvider::new(loader.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get().await })
        })
        .collect();

    let detectors: Vec<Arc<dyn ObjectDetector>> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert!(detectors.iter().all(|d| Arc::ptr_eq(d, &detectors[0])));
}

/// Test 2: A failed load is not cached
#[tokio::test]
async fn test_failed_load_retried_on_next_call() {
    let loader = Arc::new(SlowLoader::new(1));
    let provider = DetectorProvider::new(loader.clone());

    let err = provider.get().await.err().unwrap();
    assert!(err.is_unavailable());
    assert!(!provider.is_loaded());

    let detector = provider.get().await.unwrap();
    assert_eq!(detector.model_name(), "stub");
    assert!(provider.is_loaded());
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}

/// Test 3: Preloaded provider hands out the given instance
#[tokio::test]
async fn test_preloaded_provider() {
    let detector: Arc<dyn ObjectDetector> = Arc::new(StubDetector);
    let provider = DetectorProvider::preloaded(detector.clone());

    assert!(provider.is_loaded());
    assert!(Arc::ptr_eq(&provider.get().await.unwrap(), &detector));
}

// =============================================================================
// DetrLoader Tests
// =============================================================================

/// Test 4: Missing local model directory surfaces as unavailable
#[tokio::test]
async fn test_detr_loader_missing_directory() {
    let loader = DetrLoader::new(DetectorConfig {
        source: ModelSource::Local(PathBuf::from("/nonexistent/models/detr-resnet-50")),
        device: DevicePreference::Cpu,
        ..Default::default()
    });
    let provider = DetectorProvider::new(Arc::new(loader));

    let err = provider.get().await.err().unwrap();
    assert!(matches!(err, DetectorError::ModelLoad(_)));
    assert!(!provider.is_loaded());
}

/// Test 5: Local directory without the ONNX graph fails to load
#[tokio::test]
async fn test_detr_loader_directory_without_model() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"id2label": {"1": "person", "3": "car"}}"#,
    )
    .unwrap();

    let loader = DetrLoader::new(DetectorConfig {
        source: ModelSource::Local(dir.path().to_path_buf()),
        model_file: "onnx/model.onnx".to_string(),
        device: DevicePreference::Cpu,
        ..Default::default()
    });

    let files = loader.resolve_files().await.unwrap();
    assert!(files.config.is_some());
    assert!(files.preprocessor_config.is_none());

    let err = loader.load().await.err().unwrap();
    assert!(matches!(err, DetectorError::ModelLoad(_)));
    assert!(err.to_string().contains("not found"));
}

/// Test 6: Invalid threshold is rejected before any file is touched
#[tokio::test]
async fn test_detr_loader_invalid_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let loader = DetrLoader::new(DetectorConfig {
        source: ModelSource::Local(dir.path().to_path_buf()),
        confidence_threshold: -0.1,
        ..Default::default()
    });

    let err = loader.load().await.err().unwrap();
    assert!(matches!(err, DetectorError::InvalidThreshold(_)));
}
