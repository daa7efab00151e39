// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DETR (DEtection TRansformer) object detection via ONNX Runtime

pub mod labels;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod session;

pub use labels::LabelMap;
pub use model::{label_detections, DetrDetector, DetrModelFiles};
pub use postprocessing::{post_process_object_detection, RawDetection};
pub use preprocessing::{preprocess, DetrPreprocessorConfig, PixelInputs, ResizeTarget};
pub use session::{DetrOutputs, DetrSession, DevicePreference, ExecutionDevice};
