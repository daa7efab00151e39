// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detector abstraction shared by the HTTP layer and the model backends

use image::RgbImage;
use thiserror::Error;

use super::detection::Detection;

/// Default minimum score for a detection to be reported
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Errors raised while fetching, loading or running a detector
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Failed to fetch model files: {0}")]
    ModelFetch(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Confidence threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),
}

impl DetectorError {
    /// Whether the error means no detector could be constructed at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DetectorError::ModelFetch(_)
                | DetectorError::ModelLoad(_)
                | DetectorError::InvalidConfig(_)
                | DetectorError::InvalidThreshold(_)
        )
    }
}

/// Validate a confidence threshold
pub fn validate_threshold(threshold: f32) -> Result<f32, DetectorError> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(DetectorError::InvalidThreshold(threshold))
    }
}

/// A loaded object detection model
///
/// Implementations are constructed once and shared across requests, so
/// `predict` takes `&self` and must be callable from several threads.
pub trait ObjectDetector: Send + Sync {
    /// Detect objects in an RGB image
    ///
    /// Boxes are expressed in pixel coordinates of `image`, and only
    /// detections scoring above the confidence threshold are returned.
    fn predict(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError>;

    /// Minimum score a detection needs to be reported
    fn confidence_threshold(&self) -> f32;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}
