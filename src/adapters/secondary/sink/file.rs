/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! File-based snapshot repository for inspecting the published state locally

use crate::domain::{DataPoint, FieldValue, SinkError, SnapshotFormat, ValueType};
use crate::ports::SnapshotRepository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serialized form of the snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub points: Vec<SnapshotEntry>,
}

/// One data point as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Absent when the reading was unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    pub acknowledged: bool,
}

impl SnapshotEntry {
    fn from_point(point: &DataPoint, format: SnapshotFormat) -> Self {
        let value = match (&point.value, format) {
            (FieldValue::Unavailable, _) => None,
            // TOML has no null, nested values go out as JSON text
            (FieldValue::Mapping(_) | FieldValue::Sequence(_), SnapshotFormat::Toml) => {
                Some(FieldValue::Text(point.value.render()))
            }
            (value, _) => Some(value.clone()),
        };
        Self {
            path: point.path.clone(),
            name: point.metadata.as_ref().map(|m| m.name.clone()),
            unit: point.metadata.as_ref().and_then(|m| m.unit.clone()),
            value_type: point.metadata.as_ref().map(|m| m.value_type),
            value,
            acknowledged: point.acknowledged,
        }
    }
}

/// Writes the snapshot to one file, replacing it every cycle
pub struct SnapshotFileWriter {
    path: PathBuf,
    format: SnapshotFormat,
}

impl SnapshotFileWriter {
    /// Create a snapshot writer
    ///
    /// # Arguments
    /// * `path` - Target file; parent directories are created on write
    /// * `format` - JSON or TOML
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn render(&self, points: &[DataPoint]) -> Result<String, SinkError> {
        let document = SnapshotDocument {
            points: points
                .iter()
                .map(|point| SnapshotEntry::from_point(point, self.format))
                .collect(),
        };
        match self.format {
            SnapshotFormat::Json => serde_json::to_string_pretty(&document).map_err(|e| {
                SinkError::Unavailable(format!("JSON serialization failed: {}", e))
            }),
            SnapshotFormat::Toml => toml::to_string_pretty(&document).map_err(|e| {
                SinkError::Unavailable(format!("TOML serialization failed: {}", e))
            }),
        }
    }

    /// Read a previously written snapshot
    pub async fn load(path: &Path, format: SnapshotFormat) -> Result<SnapshotDocument, SinkError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SinkError::Unavailable(format!("Failed to read snapshot: {}", e)))?;
        match format {
            SnapshotFormat::Json => serde_json::from_str(&content).map_err(|e| {
                SinkError::Unavailable(format!("JSON deserialization failed: {}", e))
            }),
            SnapshotFormat::Toml => toml::from_str(&content).map_err(|e| {
                SinkError::Unavailable(format!("TOML deserialization failed: {}", e))
            }),
        }
    }
}

#[async_trait]
impl SnapshotRepository for SnapshotFileWriter {
    async fn save_snapshot(&self, points: &[DataPoint]) -> Result<(), SinkError> {
        let content = self.render(points)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    SinkError::Unavailable(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        fs::write(&self.path, content)
            .await
            .map_err(|e| SinkError::Unavailable(format!("Failed to write snapshot: {}", e)))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
