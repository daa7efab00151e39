// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Alert API endpoint module
//!
//! Provides POST /api/alerts and GET /api/alerts.

pub mod handler;
pub mod request;

pub use handler::{create_alert_handler, list_alerts_handler};
pub use request::CreateAlertRequest;
