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

//! BMC Telemetry Library
//!
//! Polls a server management controller (HPE iLO 4 style Redfish REST API),
//! maps its payloads into a flat namespace of typed data points and raises
//! threshold alerts through notification channels. The crate uses a Ports and
//! Adapters (Hexagonal) architecture for maintainability and testability.
//!
//! # Architecture
//!
//! - **Domain**: Resource mappers, alert rules, the poll cycle and scheduler
//! - **Ports**: Interfaces for the controller API, state store and notifiers
//! - **Adapters**: Redfish HTTP client, in-memory state store, notifiers
//!
//! # Usage
//!
//! ```rust,no_run
//! use bmc_telemetry::{create_service, TelemetryPollingService};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = create_service("monitor.toml").await?;
//!
//!     let report = service.run_cycle().await;
//!     println!(
//!         "{} points published, {} alerts delivered",
//!         report.points_published, report.alerts_dispatched
//!     );
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod testing;

pub use adapters::{
    HttpMessageNotifier, InMemoryStateSink, LogNotifier, RedfishHttpClient, SnapshotFileWriter,
    SpeechNotifier, TomlConfigurationProvider,
};
pub use container::{
    ContainerConfig, ContainerConfigBuilder, ServiceContainer, StaticConfigurationProvider,
};
pub use domain::{
    AlertEvent, ConfigError, CycleReport, DataPoint, FieldValue, MapperOutcome, MonitorConfig,
    PollSchedule, PollScheduler,
};
pub use ports::{
    ConfigurationProvider, ManagementApi, Notifier, SnapshotRepository, StateSink,
    TelemetryPollingService,
};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Create a telemetry polling service from a TOML configuration file
///
/// # Arguments
/// * `config_path` - Path to the monitor configuration
///
/// # Returns
/// * Configured polling service
pub async fn create_service(
    config_path: impl AsRef<Path>,
) -> Result<Arc<dyn TelemetryPollingService>, Box<dyn Error>> {
    let provider = TomlConfigurationProvider::new(config_path.as_ref());
    let container = ServiceContainer::from_provider(&provider).await?;
    container.validate()?;
    container.create_polling_service()
}

/// Create a telemetry polling service with custom container configuration
pub fn create_service_with_config(
    container_config: ContainerConfig,
) -> Result<Arc<dyn TelemetryPollingService>, Box<dyn Error>> {
    let container = ServiceContainer::new(container_config);
    container.validate()?;
    container.create_polling_service()
}
