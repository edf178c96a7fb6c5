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

//! Monitor configuration, loaded once at start and passed to every component

use crate::domain::ConfigError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

lazy_static! {
    static ref MINUTE_STEP_RE: Regex =
        Regex::new(r"^(\*|\*/(\d{1,2}))\s+\*\s+\*\s+\*\s+\*$").unwrap();
    static ref PATH_PREFIX_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]*$").unwrap();
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub controller: ControllerConfig,
    pub polling: PollingConfig,
    pub datapoints: DataPointConfig,
    pub alerts: AlertConfig,
    pub notifications: NotificationConfig,
    pub output: OutputConfig,
}

impl MonitorConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check every setting that would otherwise fail at first use
    pub fn validate(&self) -> Result<(), ConfigError> {
        let controller = &self.controller;
        if controller.host.trim().is_empty() {
            return Err(ConfigError::Invalid("controller.host is required".to_string()));
        }
        if controller.username.is_empty() {
            return Err(ConfigError::Invalid(
                "controller.username is required".to_string(),
            ));
        }
        if controller.scheme != "https" && controller.scheme != "http" {
            return Err(ConfigError::Invalid(format!(
                "controller.scheme must be 'http' or 'https', got '{}'",
                controller.scheme
            )));
        }
        if controller.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "controller.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !self.alerts.cpu_temperature_limit.is_finite() {
            return Err(ConfigError::Invalid(
                "alerts.cpu_temperature_limit must be a finite number".to_string(),
            ));
        }
        if !PATH_PREFIX_RE.is_match(&self.datapoints.prefix) {
            return Err(ConfigError::Invalid(format!(
                "datapoints.prefix '{}' may only contain letters, digits, '_', '-' and '.'",
                self.datapoints.prefix
            )));
        }
        if let Some(message) = &self.notifications.message {
            if message.endpoint.trim().is_empty() || message.user.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "notifications.message needs both endpoint and user".to_string(),
                ));
            }
        }
        if let Some(speech) = &self.notifications.speech {
            if speech.command_path.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "notifications.speech.command_path is required".to_string(),
                ));
            }
        }
        self.polling.poll_schedule()?;
        Ok(())
    }
}

/// Management controller connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Host name or IP address of the controller
    pub host: String,
    pub username: String,
    pub password: String,
    /// `https` for real controllers; `http` is accepted for lab setups
    pub scheme: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Skip TLS certificate validation. Controllers ship self-signed
    /// certificates, so this is on unless explicitly disabled.
    pub accept_invalid_certs: bool,
}

impl ControllerConfig {
    /// Base URL all resource paths are appended to
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim().trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            scheme: "https".to_string(),
            timeout_secs: 10,
            accept_invalid_certs: true,
        }
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// When cycles run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Cron-like expression; only minute steps are supported
    pub schedule: String,
    /// Fixed interval in seconds, overrides `schedule` when set
    pub interval_secs: Option<u64>,
    /// Run one cycle immediately at start
    pub run_at_startup: bool,
}

impl PollingConfig {
    pub fn poll_schedule(&self) -> Result<PollSchedule, ConfigError> {
        match self.interval_secs {
            Some(0) => Err(ConfigError::Invalid(
                "polling.interval_secs must be greater than zero".to_string(),
            )),
            Some(secs) => Ok(PollSchedule::Interval(Duration::from_secs(secs))),
            None => PollSchedule::parse_cron(&self.schedule),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            schedule: "*/2 * * * *".to_string(),
            interval_secs: None,
            run_at_startup: true,
        }
    }
}

/// Recurring trigger for poll cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSchedule {
    /// Fires on wall-clock (UTC) minute multiples, like `*/N * * * *`
    Cron { every_minutes: u64 },
    /// Fires a fixed time after the previous trigger
    Interval(Duration),
}

impl PollSchedule {
    /// Parse a cron-like expression whose minute field is `*` or `*/N`
    ///
    /// The remaining four fields must be `*` and `N` must divide 60 so the
    /// schedule repeats identically every hour.
    pub fn parse_cron(expression: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidSchedule(expression.to_string());
        let captures = MINUTE_STEP_RE.captures(expression.trim()).ok_or_else(invalid)?;

        let every_minutes = match captures.get(2) {
            Some(step) => step.as_str().parse::<u64>().map_err(|_| invalid())?,
            None => 1,
        };
        if every_minutes == 0 || 60 % every_minutes != 0 {
            return Err(invalid());
        }

        Ok(PollSchedule::Cron { every_minutes })
    }

    /// Nominal time between two triggers
    pub fn period(&self) -> Duration {
        match self {
            PollSchedule::Cron { every_minutes } => Duration::from_secs(every_minutes * 60),
            PollSchedule::Interval(interval) => *interval,
        }
    }

    /// Time to wait from `now` until the next trigger
    pub fn delay_until_next(&self, now: SystemTime) -> Duration {
        match self {
            PollSchedule::Cron { .. } => {
                let period = self.period().as_secs();
                let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
                let next = (since_epoch.as_secs() / period + 1) * period;
                Duration::from_secs(next).saturating_sub(since_epoch)
            }
            PollSchedule::Interval(interval) => *interval,
        }
    }
}

/// Data point naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPointConfig {
    /// Prefix prepended to every data point path
    pub prefix: String,
    /// Also publish the BIOS settings as one readable text point
    pub bios_dump: bool,
}

impl DataPointConfig {
    /// Join the prefix and a relative path with exactly one `.`
    pub fn full_path(&self, id: &str) -> String {
        let prefix = self.prefix.trim_end_matches('.');
        if prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", prefix, id)
        }
    }
}

impl Default for DataPointConfig {
    fn default() -> Self {
        Self {
            prefix: "bmc".to_string(),
            bios_dump: true,
        }
    }
}

/// How repeated violations are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// Alert every cycle the condition holds
    #[default]
    EveryCycle,
    /// Alert once when a condition starts; re-arm after it clears
    OnTransition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// CPU temperature limit, same unit as the sensor
    pub cpu_temperature_limit: f64,
    pub mode: AlertMode,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cpu_temperature_limit: 70.0,
            mode: AlertMode::EveryCycle,
        }
    }
}

/// Alert channels; each is enabled by its section being present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub message: Option<MessageChannelConfig>,
    pub speech: Option<SpeechChannelConfig>,
}

/// Text message channel addressed by (instance, user)
#[derive(Clone, Serialize, Deserialize)]
pub struct MessageChannelConfig {
    /// Webhook receiving the message as JSON
    pub endpoint: String,
    #[serde(default = "default_message_instance")]
    pub instance: String,
    pub user: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_message_timeout")]
    pub timeout_secs: u64,
}

fn default_message_instance() -> String {
    "telegram.0".to_string()
}

fn default_message_timeout() -> u64 {
    10
}

impl fmt::Debug for MessageChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannelConfig")
            .field("endpoint", &self.endpoint)
            .field("instance", &self.instance)
            .field("user", &self.user)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Spoken announcement channel, a device command data point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechChannelConfig {
    pub command_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Toml,
}

/// Optional local output of the current data point snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_format: SnapshotFormat,
}
