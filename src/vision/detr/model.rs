// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DETR object detector: preprocessing, forward pass and post-processing

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use super::labels::LabelMap;
use super::postprocessing::{post_process_object_detection, RawDetection};
use super::preprocessing::{preprocess, DetrPreprocessorConfig};
use super::session::{DetrSession, DevicePreference, ExecutionDevice};
use crate::vision::detection::Detection;
use crate::vision::detector::{validate_threshold, DetectorError, ObjectDetector};

/// Files making up an exported DETR model
#[derive(Debug, Clone, PartialEq)]
pub struct DetrModelFiles {
    /// ONNX graph
    pub model: PathBuf,
    /// `config.json` holding `id2label`
    pub config: Option<PathBuf>,
    /// `preprocessor_config.json`
    pub preprocessor_config: Option<PathBuf>,
}

impl DetrModelFiles {
    /// Locate model files inside a local directory
    ///
    /// Expected files:
    /// - `<model_file>` (e.g. onnx/model.onnx)
    /// - config.json (label map, optional)
    /// - preprocessor_config.json (optional)
    pub fn in_dir(dir: &Path, model_file: &str) -> Self {
        let existing = |name: &str| {
            let path = dir.join(name);
            path.exists().then_some(path)
        };

        Self {
            model: dir.join(model_file),
            config: existing("config.json"),
            preprocessor_config: existing("preprocessor_config.json"),
        }
    }
}

/// Convert surviving queries into labelled detections
pub fn label_detections(raw: Vec<RawDetection>, labels: &LabelMap) -> Vec<Detection> {
    raw.into_iter()
        .map(|r| Detection {
            label_id: r.label_id,
            label: labels.resolve(r.label_id),
            score: r.score,
            bbox: r.bbox,
        })
        .collect()
}

/// DETR detector backed by ONNX Runtime
#[derive(Debug)]
pub struct DetrDetector {
    session: DetrSession,
    preprocessor: DetrPreprocessorConfig,
    labels: LabelMap,
    confidence_threshold: f32,
    model_name: String,
}

impl DetrDetector {
    /// Load a DETR detector from its model files
    ///
    /// Missing `config.json` or `preprocessor_config.json` fall back to an
    /// empty label map and the standard DETR preprocessing respectively.
    pub fn from_files(
        model_name: impl Into<String>,
        files: &DetrModelFiles,
        device: DevicePreference,
        confidence_threshold: f32,
    ) -> Result<Self, DetectorError> {
        let model_name = model_name.into();
        let confidence_threshold = validate_threshold(confidence_threshold)?;

        let preprocessor = match &files.preprocessor_config {
            Some(path) => DetrPreprocessorConfig::from_file(path)?,
            None => {
                warn!("No preprocessor_config.json for {}, using DETR defaults", model_name);
                DetrPreprocessorConfig::default()
            }
        };

        let labels = match &files.config {
            Some(path) => LabelMap::from_config_file(path)?,
            None => {
                warn!("No config.json for {}, labels will be numeric", model_name);
                LabelMap::default()
            }
        };

        info!("Loading DETR model {} from {}", model_name, files.model.display());
        let session = DetrSession::load(&files.model, device)?;

        info!(
            "✅ DETR detector ready: {} ({} labels, threshold {:.2}, {})",
            model_name,
            labels.len(),
            confidence_threshold,
            session.device()
        );

        Ok(Self {
            session,
            preprocessor,
            labels,
            confidence_threshold,
            model_name,
        })
    }

    /// Execution provider in use
    pub fn device(&self) -> ExecutionDevice {
        self.session.device()
    }
}

impl ObjectDetector for DetrDetector {
    fn predict(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        let started = Instant::now();
        let (width, height) = image.dimensions();

        let inputs = preprocess(image, &self.preprocessor)?;
        debug!(
            "Preprocessed {}x{} image to model input {:?}",
            width,
            height,
            inputs.input_size()
        );

        let outputs = self.session.run(&inputs)?;

        let raw = post_process_object_detection(
            outputs.logits.view(),
            outputs.pred_boxes.view(),
            self.confidence_threshold,
            width,
            height,
        )?;

        let detections = label_detections(raw, &self.labels);

        debug!(
            "DETR found {} objects in {}ms",
            detections.len(),
            started.elapsed().as_millis()
        );

        Ok(detections)
    }

    fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
