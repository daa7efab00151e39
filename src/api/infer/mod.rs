// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /infer for detecting objects in uploaded images.

pub mod handler;
pub mod response;

pub use handler::{infer_handler, read_upload, Upload, UPLOAD_FIELD};
pub use response::InferenceResponse;
