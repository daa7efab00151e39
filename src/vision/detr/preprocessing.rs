// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for DETR
//!
//! Follows the Hugging Face DETR image processor: shortest-edge resize capped
//! by a longest edge, rescale to [0, 1], ImageNet normalization, NCHW layout.

use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use ndarray::{Array3, Array4};
use serde::Deserialize;

use crate::vision::detector::DetectorError;

/// Default shortest edge after resizing
pub const DEFAULT_SHORTEST_EDGE: u32 = 800;

/// Default cap on the longest edge after resizing
pub const DEFAULT_LONGEST_EDGE: u32 = 1333;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// `size` entry of `preprocessor_config.json`
///
/// Older exports store a bare integer next to a top-level `max_size`; newer
/// ones store an object with either edge limits or an exact size.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResizeTarget {
    Shortest(u32),
    Edges {
        shortest_edge: u32,
        #[serde(default)]
        longest_edge: Option<u32>,
    },
    Exact {
        height: u32,
        width: u32,
    },
}

fn default_true() -> bool {
    true
}

fn default_size() -> ResizeTarget {
    ResizeTarget::Edges {
        shortest_edge: DEFAULT_SHORTEST_EDGE,
        longest_edge: Some(DEFAULT_LONGEST_EDGE),
    }
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_mean() -> [f32; 3] {
    MEAN
}

fn default_std() -> [f32; 3] {
    STD
}

/// Preprocessing parameters, as found in `preprocessor_config.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetrPreprocessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default = "default_size")]
    pub size: ResizeTarget,
    #[serde(default)]
    pub max_size: Option<u32>,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_mean")]
    pub image_mean: [f32; 3],
    #[serde(default = "default_std")]
    pub image_std: [f32; 3],
}

impl Default for DetrPreprocessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: default_size(),
            max_size: None,
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: MEAN,
            image_std: STD,
        }
    }
}

impl DetrPreprocessorConfig {
    /// Parse a `preprocessor_config.json` document
    pub fn from_json(json: &str) -> Result<Self, DetectorError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            DetectorError::InvalidConfig(format!("preprocessor_config.json: {}", e))
        })?;

        if config.image_std.iter().any(|s| *s == 0.0) {
            return Err(DetectorError::InvalidConfig(
                "image_std must not contain zeros".to_string(),
            ));
        }

        Ok(config)
    }

    /// Read and parse a `preprocessor_config.json` file
    pub fn from_file(path: &Path) -> Result<Self, DetectorError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DetectorError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Model input size `(height, width)` for an image of the given size
    pub fn output_size(&self, height: u32, width: u32) -> (u32, u32) {
        if !self.do_resize {
            return (height, width);
        }

        match self.size {
            ResizeTarget::Shortest(size) => {
                resize_output_size(height, width, size, self.max_size)
            }
            ResizeTarget::Edges {
                shortest_edge,
                longest_edge,
            } => resize_output_size(height, width, shortest_edge, longest_edge.or(self.max_size)),
            ResizeTarget::Exact { height, width } => (height, width),
        }
    }
}

/// Pixel tensors fed to the model
#[derive(Debug, Clone)]
pub struct PixelInputs {
    /// Normalized image, shape [1, 3, H, W]
    pub pixel_values: Array4<f32>,
    /// Valid-pixel mask, shape [1, H, W]; all ones for a single unpadded image
    pub pixel_mask: Array3<i64>,
}

impl PixelInputs {
    /// `(height, width)` of the model input
    pub fn input_size(&self) -> (usize, usize) {
        let shape = self.pixel_values.shape();
        (shape[2], shape[3])
    }
}

/// Compute `(height, width)` so the shorter side equals `size` while the
/// longer side stays within `max_size`
pub fn resize_output_size(height: u32, width: u32, size: u32, max_size: Option<u32>) -> (u32, u32) {
    let (h, w) = (height as f64, width as f64);
    let mut size = size as f64;
    // Unrounded short side when capped; the long side is scaled from it
    let mut raw_size = None;

    if let Some(max_size) = max_size {
        let min_original = h.min(w);
        let max_original = h.max(w);
        if max_original / min_original * size > max_size as f64 {
            let raw = max_size as f64 * min_original / max_original;
            raw_size = Some(raw);
            size = raw.round();
        }
    }

    if (h <= w && h == size) || (w <= h && w == size) {
        return (height, width);
    }

    let long_scale = raw_size.unwrap_or(size);
    let (out_h, out_w) = if w < h {
        (long_scale * h / w, size)
    } else {
        (size, long_scale * w / h)
    };

    ((out_h as u32).max(1), (out_w as u32).max(1))
}

/// Preprocess an image for DETR
///
/// Steps:
/// 1. Resize (bilinear) to the size given by the configuration
/// 2. Rescale pixel values by `rescale_factor`
/// 3. Normalize with mean/std
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess(image: &RgbImage, config: &DetrPreprocessorConfig) -> Result<PixelInputs, DetectorError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectorError::Preprocess(format!(
            "image has invalid dimensions {}x{}",
            width, height
        )));
    }

    let (out_h, out_w) = config.output_size(height, width);

    let resized;
    let source = if (out_h, out_w) == (height, width) {
        image
    } else {
        resized = image::imageops::resize(image, out_w, out_h, FilterType::Triangle);
        &resized
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, out_h as usize, out_w as usize));

    for (x, y, pixel) in source.enumerate_pixels() {
        for c in 0..3 {
            let mut value = pixel[c] as f32;
            if config.do_rescale {
                value *= config.rescale_factor;
            }
            if config.do_normalize {
                value = (value - config.image_mean[c]) / config.image_std[c];
            }
            tensor[[0, c, y as usize, x as usize]] = value;
        }
    }

    let pixel_mask = Array3::<i64>::ones((1, out_h as usize, out_w as usize));

    Ok(PixelInputs {
        pixel_values: tensor,
        pixel_mask,
    })
}
