// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DETR output post-processing
//!
//! DETR predicts a fixed set of queries, each with class logits (the last
//! class meaning "no object") and a normalized `(cx, cy, w, h)` box.

use ndarray::{Array1, ArrayView1, ArrayView3, Axis};

use crate::vision::detection::BoundingBox;
use crate::vision::detector::DetectorError;

/// A surviving query before label names are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub label_id: i64,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Applies softmax to a 1D array and returns a new Array1<f32>
pub fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max_val = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Array1<f32> = logits.mapv(|x| (x - max_val).exp());
    let sum_exp: f32 = exp_vals.sum();
    exp_vals.mapv(|v| v / sum_exp)
}

/// Index and value of the largest element
pub fn argmax(values: ArrayView1<f32>) -> Option<(usize, f32)> {
    values
        .iter()
        .enumerate()
        .fold(None, |best, (i, &v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((i, v)),
        })
}

/// Turn raw logits and boxes into detections for the first image of a batch
///
/// # Arguments
/// - `logits`: shape [batch, queries, classes + 1]
/// - `pred_boxes`: shape [batch, queries, 4], normalized `(cx, cy, w, h)`
/// - `threshold`: queries must score strictly above this
/// - `image_width`, `image_height`: original image size in pixels
///
/// Detections keep query order. Boxes are scaled to pixels and clamped into
/// the image. A kept query with a non-finite box coordinate is an
/// `InvalidOutput` error.
pub fn post_process_object_detection(
    logits: ArrayView3<f32>,
    pred_boxes: ArrayView3<f32>,
    threshold: f32,
    image_width: u32,
    image_height: u32,
) -> Result<Vec<RawDetection>, DetectorError> {
    let (batch, queries, classes) = logits.dim();
    let (box_batch, box_queries, coords) = pred_boxes.dim();

    if batch == 0 || box_batch == 0 {
        return Err(DetectorError::InvalidOutput("empty batch".to_string()));
    }
    if queries != box_queries {
        return Err(DetectorError::InvalidOutput(format!(
            "logits have {} queries but boxes have {}",
            queries, box_queries
        )));
    }
    if coords != 4 {
        return Err(DetectorError::InvalidOutput(format!(
            "expected 4 box coordinates, got {}",
            coords
        )));
    }
    if classes < 2 {
        return Err(DetectorError::InvalidOutput(format!(
            "expected at least 2 classes including no-object, got {}",
            classes
        )));
    }

    let width = image_width as f32;
    let height = image_height as f32;

    let logits_2d = logits.index_axis(Axis(0), 0);
    let boxes_2d = pred_boxes.index_axis(Axis(0), 0);

    let mut detections = Vec::new();

    for (class_row, box_row) in logits_2d.axis_iter(Axis(0)).zip(boxes_2d.axis_iter(Axis(0))) {
        let probs = softmax(class_row);
        // Last class is "no object"
        let object_probs = probs.slice(ndarray::s![..classes - 1]);

        let Some((label, score)) = argmax(object_probs) else {
            continue;
        };

        if !score.is_finite() || score <= threshold {
            continue;
        }

        if box_row.iter().any(|v| !v.is_finite()) {
            return Err(DetectorError::InvalidOutput(format!(
                "non-finite box coordinates {:?}",
                box_row.to_vec()
            )));
        }

        let bbox = BoundingBox::from_normalized_center(
            box_row[0], box_row[1], box_row[2], box_row[3], width, height,
        )
        .clamp_to(width, height);

        detections.push(RawDetection {
            label_id: label as i64,
            score,
            bbox,
        });
    }

    Ok(detections)
}
