// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session for DETR
//!
//! Wraps the exported `DetrForObjectDetection` graph:
//! - inputs: `pixel_values` [1, 3, H, W] and, for some exports, `pixel_mask` [1, H, W]
//! - outputs: `logits` [1, Q, C + 1] and `pred_boxes` [1, Q, 4]

use anyhow::Context;
use ndarray::{Array3, Ix3};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::preprocessing::PixelInputs;
use crate::vision::detector::DetectorError;

const PIXEL_VALUES_INPUT: &str = "pixel_values";
const PIXEL_MASK_INPUT: &str = "pixel_mask";
const LOGITS_OUTPUT: &str = "logits";
const PRED_BOXES_OUTPUT: &str = "pred_boxes";

/// Which execution provider to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DevicePreference {
    /// CUDA when it can be registered, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Execution provider the session ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDevice {
    Cuda,
    Cpu,
}

impl fmt::Display for ExecutionDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionDevice::Cuda => write!(f, "cuda"),
            ExecutionDevice::Cpu => write!(f, "cpu"),
        }
    }
}

/// Raw DETR outputs for one image
#[derive(Debug, Clone)]
pub struct DetrOutputs {
    pub logits: Array3<f32>,
    pub pred_boxes: Array3<f32>,
}

/// Loaded DETR graph
pub struct DetrSession {
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    pixel_values_input: String,
    pixel_mask_input: Option<String>,
    device: ExecutionDevice,
}

impl fmt::Debug for DetrSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetrSession")
            .field("pixel_values_input", &self.pixel_values_input)
            .field("pixel_mask_input", &self.pixel_mask_input)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

fn commit_session(model_path: &Path, provider: ExecutionProviderDispatch) -> anyhow::Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([provider])
        .context("Failed to set execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!("Failed to load DETR model from {}", model_path.display()))?;
    Ok(session)
}

fn cuda_provider() -> ExecutionProviderDispatch {
    CUDAExecutionProvider::default().build().error_on_failure()
}

fn cpu_provider() -> ExecutionProviderDispatch {
    CPUExecutionProvider::default().build()
}

impl DetrSession {
    /// Load the DETR ONNX graph
    ///
    /// # Errors
    /// Returns `ModelLoad` if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - CUDA was required but could not be registered
    pub fn load(model_path: &Path, preference: DevicePreference) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelLoad(format!(
                "DETR model not found: {}",
                model_path.display()
            )));
        }

        let (session, device) = match preference {
            DevicePreference::Cpu => (commit_session(model_path, cpu_provider()), ExecutionDevice::Cpu),
            DevicePreference::Cuda => (commit_session(model_path, cuda_provider()), ExecutionDevice::Cuda),
            DevicePreference::Auto => {
                info!("   Attempting CUDA execution provider...");
                match commit_session(model_path, cuda_provider()) {
                    Ok(session) => {
                        info!("✅ CUDA execution provider initialized successfully!");
                        (Ok(session), ExecutionDevice::Cuda)
                    }
                    Err(e) => {
                        warn!("⚠️  CUDA execution provider failed: {:#}", e);
                        warn!("   Falling back to CPU execution provider");
                        (commit_session(model_path, cpu_provider()), ExecutionDevice::Cpu)
                    }
                }
            }
        };

        let session = session.map_err(|e| DetectorError::ModelLoad(format!("{:#}", e)))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        debug!("DETR inputs: {:?}, outputs: {:?}", input_names, output_names);

        for required in [LOGITS_OUTPUT, PRED_BOXES_OUTPUT] {
            if !output_names.iter().any(|name| name == required) {
                return Err(DetectorError::ModelLoad(format!(
                    "model has no '{}' output (outputs: {:?})",
                    required, output_names
                )));
            }
        }

        let pixel_values_input = input_names
            .iter()
            .find(|name| name.as_str() == PIXEL_VALUES_INPUT)
            .or_else(|| input_names.first())
            .cloned()
            .ok_or_else(|| DetectorError::ModelLoad("model declares no inputs".to_string()))?;

        let pixel_mask_input = input_names
            .iter()
            .find(|name| name.as_str() == PIXEL_MASK_INPUT)
            .cloned();

        info!("✅ DETR session ready on {}", device);

        Ok(Self {
            session: Mutex::new(session),
            pixel_values_input,
            pixel_mask_input,
            device,
        })
    }

    /// Execution provider in use
    pub fn device(&self) -> ExecutionDevice {
        self.device
    }

    /// Run one forward pass
    pub fn run(&self, inputs: &PixelInputs) -> Result<DetrOutputs, DetectorError> {
        let pixel_values = Value::from_array(inputs.pixel_values.clone())
            .map_err(|e| DetectorError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::Inference("session lock poisoned".to_string()))?;

        let outputs = match &self.pixel_mask_input {
            Some(mask_input) => {
                let pixel_mask = Value::from_array(inputs.pixel_mask.clone()).map_err(|e| {
                    DetectorError::Inference(format!("failed to create mask tensor: {}", e))
                })?;
                session.run(ort::inputs![
                    self.pixel_values_input.as_str() => pixel_values,
                    mask_input.as_str() => pixel_mask
                ])
            }
            None => session.run(ort::inputs![self.pixel_values_input.as_str() => pixel_values]),
        }
        .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let extract = |name: &str| -> Result<Array3<f32>, DetectorError> {
            let value = outputs
                .get(name)
                .ok_or_else(|| DetectorError::InvalidOutput(format!("missing '{}' output", name)))?;
            let array = value
                .try_extract_array::<f32>()
                .map_err(|e| DetectorError::InvalidOutput(format!("'{}': {}", name, e)))?;
            let array = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| DetectorError::InvalidOutput(format!("'{}': {}", name, e)))?;
            Ok(array.to_owned())
        };

        let logits = extract(LOGITS_OUTPUT)?;
        let pred_boxes = extract(PRED_BOXES_OUTPUT)?;

        debug!(
            "DETR output shapes: logits {:?}, pred_boxes {:?}",
            logits.shape(),
            pred_boxes.shape()
        );

        Ok(DetrOutputs { logits, pred_boxes })
    }
}
