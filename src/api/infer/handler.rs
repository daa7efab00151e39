// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection endpoint handler

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use bytes::Bytes;
use tracing::{debug, info, warn};

use super::response::InferenceResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_image_bytes, is_image_content_type, ObjectDetector};

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// The uploaded file part of an inference request
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::InvalidRequest(err.body_text())
    }
}

/// Read the `file` field of a multipart body, skipping any other fields
///
/// The body of a part whose content type is not an image is left unread, so
/// its size never counts against the upload limit.
pub async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if !is_image_content_type(content_type.as_deref()) {
            return Ok(Upload {
                file_name,
                content_type,
                bytes: Bytes::new(),
            });
        }

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::ValidationError {
        field: UPLOAD_FIELD.to_string(),
        message: "file field is required".to_string(),
    })
}

/// POST /infer - Detect objects in an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in a field named `file`.
///
/// # Response
/// `{"detections": [{"label_id", "label", "score", "box": {...}}]}`.
/// Uploads whose declared content type is not an image get an empty list.
///
/// # Errors
/// - 400 Bad Request: no `file` field, malformed body, or undecodable image
/// - 413 Payload Too Large: upload over the configured limit
/// - 503 Service Unavailable: the model could not be loaded
/// - 500 Internal Server Error: inference failed
pub async fn infer_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InferenceResponse>, ApiError> {
    let started = Instant::now();

    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected multipart body: {}", e.body_text());
        ApiError::InvalidRequest(e.body_text())
    })?;

    let upload = read_upload(&mut multipart, state.max_upload_bytes).await?;

    if !is_image_content_type(upload.content_type.as_deref()) {
        info!(
            "Ignoring non-image upload {:?} ({:?})",
            upload.file_name, upload.content_type
        );
        return Ok(Json(InferenceResponse::empty()));
    }

    let (image, image_info) =
        decode_image_bytes(&upload.bytes, state.max_upload_bytes).map_err(|e| {
            warn!("Failed to decode image {:?}: {}", upload.file_name, e);
            ApiError::from(e)
        })?;

    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        image_info.width, image_info.height, image_info.format, image_info.size_bytes
    );

    let detector = state.detector.get().await.map_err(|e| {
        warn!("Detector unavailable: {}", e);
        ApiError::from(e)
    })?;

    let detections = tokio::task::spawn_blocking(move || detector.predict(&image))
        .await
        .map_err(|e| ApiError::InternalError(format!("inference task failed: {}", e)))?
        .map_err(|e| {
            warn!("Inference failed: {}", e);
            ApiError::from(e)
        })?;

    info!(
        "Detected {} objects in {}x{} image ({}ms)",
        detections.len(),
        image_info.width,
        image_info.height,
        started.elapsed().as_millis()
    );

    Ok(Json(InferenceResponse::new(detections)))
}
