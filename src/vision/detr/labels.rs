// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class label map read from the model's `config.json`

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::vision::detector::DetectorError;

#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Mapping from integer class ids to human-readable names
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: HashMap<i64, String>,
}

impl LabelMap {
    /// Parse the `id2label` table of a model `config.json` document
    pub fn from_config_json(json: &str) -> Result<Self, DetectorError> {
        let config: ModelConfigFile = serde_json::from_str(json)
            .map_err(|e| DetectorError::InvalidConfig(format!("config.json: {}", e)))?;

        let labels = config
            .id2label
            .into_iter()
            .map(|(id, name)| {
                id.trim()
                    .parse::<i64>()
                    .map(|id| (id, name))
                    .map_err(|_| {
                        DetectorError::InvalidConfig(format!("non-numeric label id '{}'", id))
                    })
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self { labels })
    }

    /// Read the label map from a `config.json` file
    pub fn from_config_file(path: &Path) -> Result<Self, DetectorError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DetectorError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_config_json(&json)
    }

    /// Resolve a class id to its name
    ///
    /// Ids missing from the map render as `LABEL_<id>`, the naming the model
    /// hub uses for unnamed classes.
    pub fn resolve(&self, id: i64) -> String {
        self.labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{}", id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(i64, String)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
