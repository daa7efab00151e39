// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Alert endpoint handlers

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use super::request::CreateAlertRequest;
use crate::alerts::Alert;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /api/alerts - Record a safety alert
///
/// # Request
/// - `type`: Alert kind (required)
/// - `cameraId`: Reporting camera (required)
/// - `timestamp`: RFC 3339 time - defaults to now
/// - `imageUrl`: Snapshot URL (optional)
/// - `status`: defaults to "Pending"
///
/// # Errors
/// - 400 Bad Request: malformed JSON or a missing required field
pub async fn create_alert_handler(
    State(state): State<AppState>,
    request: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let Json(request) = request.map_err(|e| {
        warn!("Rejected alert body: {}", e.body_text());
        ApiError::InvalidRequest(e.body_text())
    })?;

    let new_alert = request.into_new_alert().map_err(|e| {
        warn!("Alert validation failed: {}", e);
        e
    })?;

    let alert = state.alerts.create(new_alert).await;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// GET /api/alerts - List all alerts, newest first
pub async fn list_alerts_handler(State(state): State<AppState>) -> Json<Vec<Alert>> {
    let alerts = state.alerts.list().await;
    debug!("Listing {} alerts", alerts.len());
    Json(alerts)
}
