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

//! In-process state store

use crate::domain::{DataPoint, DataPointMetadata, FieldValue, SinkError};
use crate::ports::StateSink;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

lazy_static! {
    /// Dot-separated, non-empty segments of `[A-Za-z0-9_-]`
    static ref DATA_POINT_PATH_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").unwrap();
}

#[derive(Default)]
struct SinkState {
    points: BTreeMap<String, DataPoint>,
    /// Declared from an unavailable value; the first typed publish fixes the type
    provisional: HashSet<String>,
}

/// State sink keeping every data point in memory, ordered by path
#[derive(Default)]
pub struct InMemoryStateSink {
    state: RwLock<SinkState>,
}

impl InMemoryStateSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<DataPoint> {
        self.state.read().await.points.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.points.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.points.is_empty()
    }

    fn validate_path(path: &str) -> Result<(), SinkError> {
        if DATA_POINT_PATH_RE.is_match(path) {
            Ok(())
        } else {
            Err(SinkError::InvalidPath(path.to_string()))
        }
    }

    /// Unavailable values are accepted for every declared type
    fn check_type(
        path: &str,
        metadata: &DataPointMetadata,
        value: &FieldValue,
    ) -> Result<(), SinkError> {
        match value.value_type() {
            Some(actual) if actual != metadata.value_type => Err(SinkError::TypeMismatch {
                path: path.to_string(),
                expected: metadata.value_type.to_string(),
                actual: actual.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StateSink for InMemoryStateSink {
    async fn declare(
        &self,
        path: &str,
        default: FieldValue,
        metadata: DataPointMetadata,
    ) -> Result<bool, SinkError> {
        Self::validate_path(path)?;
        let mut state = self.state.write().await;

        match state.points.get_mut(path) {
            Some(point) if point.metadata.is_some() => Ok(false),
            Some(point) => {
                // Published before anyone declared it; adopt the metadata only
                point.metadata = Some(metadata);
                Ok(true)
            }
            None => {
                Self::check_type(path, &metadata, &default)?;
                if default.is_unavailable() {
                    state.provisional.insert(path.to_string());
                }
                state.points.insert(
                    path.to_string(),
                    DataPoint {
                        path: path.to_string(),
                        metadata: Some(metadata),
                        value: default,
                        acknowledged: true,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn publish(
        &self,
        path: &str,
        value: FieldValue,
        acknowledge: bool,
    ) -> Result<(), SinkError> {
        Self::validate_path(path)?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.points.get_mut(path) {
            Some(point) => {
                if let Some(metadata) = point.metadata.as_mut() {
                    match value.value_type() {
                        Some(actual) if state.provisional.remove(path) => {
                            if actual != metadata.value_type {
                                log::debug!("Data point {} typed as {}", path, actual);
                            }
                            metadata.value_type = actual;
                        }
                        _ => Self::check_type(path, metadata, &value)?,
                    }
                }
                point.value = value;
                point.acknowledged = acknowledge;
            }
            None => {
                log::debug!("Publishing to undeclared data point {}", path);
                state.points.insert(
                    path.to_string(),
                    DataPoint {
                        path: path.to_string(),
                        metadata: None,
                        value,
                        acknowledged: acknowledge,
                    },
                );
            }
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<DataPoint>, SinkError> {
        Ok(self.state.read().await.points.values().cloned().collect())
    }
}
