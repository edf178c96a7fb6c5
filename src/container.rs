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

//! Dependency injection container for the telemetry polling services

use crate::adapters::{
    HttpMessageNotifier, InMemoryStateSink, LogNotifier, RedfishHttpClient, SnapshotFileWriter,
    SpeechNotifier,
};
use crate::domain::{
    default_mappers, AlertDispatcher, AlertEvaluator, AlertMode, ConfigError, MessageChannelConfig,
    MonitorConfig, PollScheduler, SnapshotFormat, SpeechChannelConfig, TelemetryPoller,
};
use crate::ports::{
    ConfigurationProvider, ManagementApi, Notifier, SnapshotRepository, StateSink,
    TelemetryPollingService,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the dependency injection container
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub monitor: MonitorConfig,
}

/// Configuration provider serving a fixed, in-memory configuration
pub struct StaticConfigurationProvider {
    config: MonitorConfig,
}

impl StaticConfigurationProvider {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ConfigurationProvider for StaticConfigurationProvider {
    async fn load_config(&self) -> Result<MonitorConfig, ConfigError> {
        Ok(self.config.clone())
    }

    fn describe(&self) -> String {
        "in-memory configuration".to_string()
    }
}

/// Dependency injection container
///
/// Owns the state sink so the poller and the speech channel share one store.
pub struct ServiceContainer {
    config: ContainerConfig,
    sink: Arc<InMemoryStateSink>,
}

impl ServiceContainer {
    /// Create a new service container with configuration
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            sink: Arc::new(InMemoryStateSink::new()),
        }
    }

    /// Create a container from a loaded configuration source
    pub async fn from_provider(
        provider: &dyn ConfigurationProvider,
    ) -> Result<Self, ConfigError> {
        log::info!("Loading configuration from {}", provider.describe());
        let monitor = provider.load_config().await?;
        Ok(Self::new(ContainerConfig { monitor }))
    }

    pub fn monitor_config(&self) -> &MonitorConfig {
        &self.config.monitor
    }

    /// Check the configuration before anything connects
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.monitor.validate()
    }

    /// The shared state sink
    pub fn state_sink(&self) -> Arc<InMemoryStateSink> {
        self.sink.clone()
    }

    /// Create the management controller client
    pub fn create_management_api(&self) -> Result<Arc<dyn ManagementApi>, Box<dyn Error>> {
        let client = RedfishHttpClient::from_config(&self.config.monitor.controller)?;
        Ok(Arc::new(client))
    }

    /// Create the alert channels
    ///
    /// Alerts go to the log when no message channel is configured.
    pub fn create_notifiers(&self) -> Result<Vec<Arc<dyn Notifier>>, Box<dyn Error>> {
        let notifications = &self.config.monitor.notifications;
        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

        match &notifications.message {
            Some(message) => notifiers.push(Arc::new(HttpMessageNotifier::new(message)?)),
            None => {
                log::warn!("No message channel configured, alerts will only be logged");
                notifiers.push(Arc::new(LogNotifier));
            }
        }
        if let Some(speech) = &notifications.speech {
            let sink: Arc<dyn StateSink> = self.sink.clone();
            notifiers.push(Arc::new(SpeechNotifier::new(sink, &speech.command_path)));
        }

        Ok(notifiers)
    }

    /// Create the snapshot writer, if an output path is configured
    pub fn create_snapshot_repository(&self) -> Option<Arc<dyn SnapshotRepository>> {
        let output = &self.config.monitor.output;
        output.snapshot_path.as_ref().map(|path| {
            Arc::new(SnapshotFileWriter::new(path.clone(), output.snapshot_format))
                as Arc<dyn SnapshotRepository>
        })
    }

    /// Create the complete telemetry polling service
    pub fn create_polling_service(
        &self,
    ) -> Result<Arc<dyn TelemetryPollingService>, Box<dyn Error>> {
        let monitor = &self.config.monitor;
        let api = self.create_management_api()?;
        let notifiers = self.create_notifiers()?;

        let mut poller = TelemetryPoller::new(
            api,
            self.sink.clone(),
            default_mappers(&monitor.datapoints),
            monitor.datapoints.clone(),
            AlertEvaluator::new(monitor.alerts.cpu_temperature_limit, monitor.alerts.mode),
            AlertDispatcher::new(notifiers),
        );
        if let Some(repository) = self.create_snapshot_repository() {
            log::info!("Writing data point snapshots to {}", repository.location());
            poller = poller.with_snapshots(repository);
        }

        Ok(Arc::new(poller))
    }

    /// Create the scheduler for daemon mode
    pub fn create_scheduler(&self) -> Result<PollScheduler, ConfigError> {
        let polling = &self.config.monitor.polling;
        Ok(PollScheduler::new(
            polling.poll_schedule()?,
            polling.run_at_startup,
        ))
    }
}

/// Builder pattern for container configuration
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
        }
    }

    /// Start from an existing monitor configuration
    pub fn from_monitor(monitor: MonitorConfig) -> Self {
        Self {
            config: ContainerConfig { monitor },
        }
    }

    /// Set controller host and credentials
    pub fn controller(mut self, host: &str, username: &str, password: &str) -> Self {
        let controller = &mut self.config.monitor.controller;
        controller.host = host.to_string();
        controller.username = username.to_string();
        controller.password = password.to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.monitor.controller.timeout_secs = secs;
        self
    }

    /// Skip TLS verification
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.monitor.controller.accept_invalid_certs = accept;
        self
    }

    /// Set the data point prefix
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.config.monitor.datapoints.prefix = prefix.to_string();
        self
    }

    /// Set the poll schedule expression
    pub fn schedule(mut self, expression: &str) -> Self {
        self.config.monitor.polling.schedule = expression.to_string();
        self
    }

    /// Set the CPU temperature limit and alert mode
    pub fn alerts(mut self, cpu_temperature_limit: f64, mode: AlertMode) -> Self {
        self.config.monitor.alerts.cpu_temperature_limit = cpu_temperature_limit;
        self.config.monitor.alerts.mode = mode;
        self
    }

    /// Enable the message channel
    pub fn message_channel(mut self, channel: MessageChannelConfig) -> Self {
        self.config.monitor.notifications.message = Some(channel);
        self
    }

    /// Enable the speech channel
    pub fn speech_channel(mut self, command_path: &str) -> Self {
        self.config.monitor.notifications.speech = Some(SpeechChannelConfig {
            command_path: command_path.to_string(),
        });
        self
    }

    /// Write snapshots after every cycle
    pub fn snapshot(mut self, path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        self.config.monitor.output.snapshot_path = Some(path.into());
        self.config.monitor.output.snapshot_format = format;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
