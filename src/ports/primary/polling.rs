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

use crate::domain::CycleReport;
use async_trait::async_trait;

/// Primary port - Main interface offered by the telemetry polling domain
///
/// The scheduler and the CLI drive the system through this trait.
#[async_trait]
pub trait TelemetryPollingService: Send + Sync {
    /// Run every resource mapper once, in order
    ///
    /// Never fails as a whole: mapper failures are isolated and reported in
    /// the returned [`CycleReport`]. When another cycle is still running the
    /// call returns immediately with [`CycleReport::skipped`] set.
    async fn run_cycle(&self) -> CycleReport;

    /// Names of the mappers in execution order
    fn mapper_names(&self) -> Vec<&'static str>;
}
