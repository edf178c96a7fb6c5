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

use crate::domain::{DataPoint, DataPointMetadata, FieldValue, SinkError};
use async_trait::async_trait;

/// Secondary port - Host platform state store
///
/// Both operations must be safe to call every cycle for the same path.
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Declare a data point or reuse an existing one
    ///
    /// The first call for a path fixes its metadata and sets `default` as the
    /// initial value. Later calls leave metadata and value untouched.
    ///
    /// # Returns
    /// * `Ok(true)` - Point was created by this call
    /// * `Ok(false)` - Point already existed
    /// * `Err(SinkError)` - Path or default value rejected
    async fn declare(
        &self,
        path: &str,
        default: FieldValue,
        metadata: DataPointMetadata,
    ) -> Result<bool, SinkError>;

    /// Record the current value of a data point
    ///
    /// # Arguments
    /// * `path` - Full data point path
    /// * `value` - New value
    /// * `acknowledge` - `true` for confirmed sensor readings, `false` for
    ///   commands addressed to the point's owner
    async fn publish(&self, path: &str, value: FieldValue, acknowledge: bool)
        -> Result<(), SinkError>;

    /// Current state of every point, ordered by path
    async fn snapshot(&self) -> Result<Vec<DataPoint>, SinkError>;
}
