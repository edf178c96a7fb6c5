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

use crate::domain::{DataPoint, SinkError};
use async_trait::async_trait;

/// Secondary port - Persistence of the data point snapshot after a cycle
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Replace the stored snapshot with `points`
    async fn save_snapshot(&self, points: &[DataPoint]) -> Result<(), SinkError>;

    /// Where snapshots go, for log entries
    fn location(&self) -> String;
}
