// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Status given to alerts created without one
pub const DEFAULT_ALERT_STATUS: &str = "Pending";

/// A stored safety alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub status: String,
}

/// Fields supplied when recording an alert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAlert {
    pub alert_type: String,
    pub camera_id: String,
    /// Defaults to the time of insertion
    pub timestamp: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// Defaults to [`DEFAULT_ALERT_STATUS`]
    pub status: Option<String>,
}

/// In-memory alert log
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an alert, filling in id, timestamp and status defaults
    pub async fn create(&self, new_alert: NewAlert) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            alert_type: new_alert.alert_type,
            camera_id: new_alert.camera_id,
            timestamp: new_alert.timestamp.unwrap_or_else(Utc::now),
            image_url: new_alert.image_url,
            status: new_alert
                .status
                .unwrap_or_else(|| DEFAULT_ALERT_STATUS.to_string()),
        };

        info!(
            "🚨 Alert recorded: {} from camera {}",
            alert.alert_type, alert.camera_id
        );

        self.alerts.write().await.push(alert.clone());
        alert
    }

    /// All alerts, newest timestamp first
    ///
    /// Alerts sharing a timestamp are listed most recently inserted first.
    pub async fn list(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.read().await.iter().rev().cloned().collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}
