// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection result types returned by the object detector

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates of the source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    /// Build a corner box from a normalized `(cx, cy, w, h)` box
    pub fn from_normalized_center(cx: f32, cy: f32, w: f32, h: f32, width: f32, height: f32) -> Self {
        Self {
            x_min: (cx - 0.5 * w) * width,
            y_min: (cy - 0.5 * h) * height,
            x_max: (cx + 0.5 * w) * width,
            y_max: (cy + 0.5 * h) * height,
        }
    }

    /// Clamp the corners into `[0, width] x [0, height]`
    pub fn clamp_to(self, width: f32, height: f32) -> Self {
        Self {
            x_min: self.x_min.clamp(0.0, width),
            y_min: self.y_min.clamp(0.0, height),
            x_max: self.x_max.clamp(0.0, width),
            y_max: self.y_max.clamp(0.0, height),
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Whether the corners are ordered and lie inside the image
    pub fn is_within(&self, width: f32, height: f32) -> bool {
        self.x_min >= 0.0
            && self.y_min >= 0.0
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
            && self.x_max <= width
            && self.y_max <= height
    }
}

/// One recognized object instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class identifier from the model's label space
    pub label_id: i64,
    /// Human-readable class name
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub score: f32,
    /// Location in the original image
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}
