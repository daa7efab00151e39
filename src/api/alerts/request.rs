// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Alert request types and validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::NewAlert;
use crate::api::errors::ApiError;

/// Request to record a safety alert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    /// Alert kind, e.g. "no-helmet" (required)
    #[serde(rename = "type", default)]
    pub alert_type: Option<String>,

    /// Reporting camera (required)
    #[serde(default)]
    pub camera_id: Option<String>,

    /// When the event happened - defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Snapshot of the event
    #[serde(default)]
    pub image_url: Option<String>,

    /// Defaults to "Pending"
    #[serde(default)]
    pub status: Option<String>,
}

fn required(value: &Option<String>, field: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("{} is required", field),
        }),
    }
}

impl CreateAlertRequest {
    /// Validate and convert into the store's input type
    pub fn into_new_alert(self) -> Result<NewAlert, ApiError> {
        let alert_type = required(&self.alert_type, "type")?;
        let camera_id = required(&self.camera_id, "cameraId")?;

        Ok(NewAlert {
            alert_type,
            camera_id,
            timestamp: self.timestamp,
            image_url: self.image_url,
            status: self.status,
        })
    }
}
