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

use crate::domain::ApiError;
use async_trait::async_trait;
use serde_json::Value;

/// Secondary port - Management controller REST access
///
/// Abstracts the authenticated transport to the controller so mappers can be
/// exercised against canned payloads.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Fetch one JSON resource
    ///
    /// # Arguments
    /// * `path` - Resource path relative to the controller base URL, e.g.
    ///   `/rest/v1/Chassis/1/Thermal`, or an `href` taken from a prior response
    ///
    /// # Returns
    /// * `Ok(Value)` - Parsed JSON body
    /// * `Err(ApiError)` - Transport, status or decode failure
    async fn get(&self, path: &str) -> Result<Value, ApiError>;
}
