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

//! TOML file configuration source

use crate::domain::{ConfigError, MonitorConfig};
use crate::ports::ConfigurationProvider;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Reads the monitor configuration from a TOML file
pub struct TomlConfigurationProvider {
    path: PathBuf,
}

impl TomlConfigurationProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigurationProvider for TomlConfigurationProvider {
    async fn load_config(&self) -> Result<MonitorConfig, ConfigError> {
        let content = fs::read_to_string(&self.path).await?;
        let config = MonitorConfig::from_toml_str(&content)?;
        log::debug!("Loaded configuration from {}", self.path.display());
        Ok(config)
    }

    fn describe(&self) -> String {
        format!("TOML file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertMode, PollSchedule};
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    #[tokio::test]
    async fn test_load_full_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("monitor.toml");
        file.write_str(
            r#"
[controller]
host = "ilo.lab.local"
username = "monitor"
password = "s3cret"
accept_invalid_certs = false

[polling]
schedule = "*/5 * * * *"

[datapoints]
prefix = "0_userdata.0.iLO"

[alerts]
cpu_temperature_limit = 75
mode = "on_transition"

[notifications.message]
endpoint = "http://127.0.0.1:8087/notify"
user = "admin"

[notifications.speech]
command_path = "alexa2.0.Echo-Devices.G090XX.Commands.speak"

[output]
snapshot_path = "/var/lib/bmc/snapshot.toml"
snapshot_format = "toml"
"#,
        )
        .unwrap();

        let provider = TomlConfigurationProvider::new(file.path());
        let config = provider.load_config().await.unwrap();
        config.validate().unwrap();

        assert_eq!(config.controller.host, "ilo.lab.local");
        assert!(!config.controller.accept_invalid_certs);
        assert_eq!(config.controller.timeout_secs, 10);
        assert_eq!(
            config.polling.poll_schedule().unwrap(),
            PollSchedule::Cron { every_minutes: 5 }
        );
        assert_eq!(config.alerts.cpu_temperature_limit, 75.0);
        assert_eq!(config.alerts.mode, AlertMode::OnTransition);
        assert_eq!(
            config.notifications.message.as_ref().unwrap().instance,
            "telegram.0"
        );
        assert_eq!(
            config.datapoints.full_path("temperatures.CPU1"),
            "0_userdata.0.iLO.temperatures.CPU1"
        );
        assert!(predicate::str::contains("monitor.toml").eval(&provider.describe()));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let provider = TomlConfigurationProvider::new(temp.child("absent.toml").path());
        assert!(matches!(
            provider.load_config().await,
            Err(ConfigError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("broken.toml");
        file.write_str("[controller\nhost = ").unwrap();

        let provider = TomlConfigurationProvider::new(file.path());
        assert!(matches!(
            provider.load_config().await,
            Err(ConfigError::Parse(_))
        ));
    }
}
