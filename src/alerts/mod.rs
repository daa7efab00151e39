// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Safety alert log
//!
//! Camera clients report alerts (e.g. a worker without a helmet) and the
//! dashboard lists them. Alerts live in memory for the process lifetime.

pub mod store;

pub use store::{Alert, AlertStore, NewAlert, DEFAULT_ALERT_STATUS};
