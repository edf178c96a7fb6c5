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

use crate::domain::{ConfigError, MonitorConfig};
use async_trait::async_trait;

/// Secondary port - Configuration provider abstraction
///
/// This interface abstracts where the monitor configuration comes from
/// (files, environment, tests). It is read once at start.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Load the monitor configuration
    ///
    /// # Returns
    /// * `Ok(MonitorConfig)` - Parsed, not yet validated configuration
    /// * `Err(ConfigError)` - Source missing or malformed
    async fn load_config(&self) -> Result<MonitorConfig, ConfigError>;

    /// Human readable description of the source, for logging
    fn describe(&self) -> String;
}
