// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference response types

use serde::{Deserialize, Serialize};

use crate::vision::Detection;

/// Response from POST /infer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InferenceResponse {
    /// Detections in the order the model produced them
    pub detections: Vec<Detection>,
}

impl InferenceResponse {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Response for uploads that are not images
    pub fn empty() -> Self {
        Self::default()
    }
}
