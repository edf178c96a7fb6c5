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

//! HTTP message channel for alert texts

use crate::domain::{AlertEvent, MessageChannelConfig, NotifyError};
use crate::ports::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Message channel that posts each alert to a webhook as JSON
///
/// The body addresses a messaging adapter instance and a recipient:
/// `{"instance": "...", "user": "...", "text": "..."}`.
pub struct HttpMessageNotifier {
    client: Client,
    endpoint: String,
    instance: String,
    user: String,
    auth_token: Option<String>,
}

impl HttpMessageNotifier {
    /// Create a new message notifier
    ///
    /// # Arguments
    /// * `config` - Endpoint, addressing and optional bearer token
    pub fn new(config: &MessageChannelConfig) -> Result<Self, NotifyError> {
        if config.endpoint.is_empty() {
            return Err(NotifyError::Configuration(
                "No endpoint URL provided".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                NotifyError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            instance: config.instance.clone(),
            user: config.user.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn create_payload(&self, alert: &AlertEvent) -> serde_json::Value {
        json!({
            "instance": self.instance,
            "user": self.user,
            "text": alert.message,
        })
    }
}

#[async_trait]
impl Notifier for HttpMessageNotifier {
    fn channel(&self) -> &str {
        &self.instance
    }

    async fn notify(&self, alert: &AlertEvent) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&self.create_payload(alert));

        if let Some(ref token) = self.auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("Failed to send request: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }
}
