// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for object detection
//!
//! This module provides:
//! - Image decoding for uploaded payloads
//! - The `ObjectDetector` abstraction and its DETR implementation
//! - The lazily-initialized detector provider shared by the HTTP layer

pub mod detection;
pub mod detector;
pub mod detr;
pub mod image_utils;
pub mod model_manager;

pub use detection::{BoundingBox, Detection};
pub use detector::{validate_threshold, DetectorError, ObjectDetector, DEFAULT_CONFIDENCE_THRESHOLD};
pub use detr::{DetrDetector, DevicePreference, ExecutionDevice};
pub use image_utils::{decode_image_bytes, is_image_content_type, ImageError, ImageInfo};
pub use model_manager::{
    DetectorConfig, DetectorLoader, DetectorProvider, DetrLoader, ModelSource,
};
