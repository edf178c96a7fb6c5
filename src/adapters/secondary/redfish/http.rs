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

//! Redfish REST client for HPE iLO style management controllers

use crate::domain::{ApiError, ControllerConfig};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Management API over HTTPS with basic authentication
pub struct RedfishHttpClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl RedfishHttpClient {
    /// Create a new Redfish client
    ///
    /// # Arguments
    /// * `base_url` - Scheme and host, e.g. `https://10.0.0.5`
    /// * `username` - Basic auth user
    /// * `password` - Basic auth password
    /// * `timeout` - Per-request timeout
    /// * `accept_invalid_certs` - Whether to skip TLS certificate verification
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Create from the controller section of the configuration
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ApiError> {
        if config.accept_invalid_certs {
            log::warn!(
                "TLS certificate verification disabled for {}",
                config.host.trim()
            );
        }
        Self::new(
            &config.base_url(),
            &config.username,
            &config.password,
            config.timeout(),
            config.accept_invalid_certs,
        )
    }

    /// Resolve a resource path or an absolute link to a URL
    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

fn request_error(path: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(format!("{path}: {err}"))
    } else {
        ApiError::Transport(format!("{path}: {err}"))
    }
}

#[async_trait]
impl ManagementApi for RedfishHttpClient {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url_for(path);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_error(path, e))?;

        let status = response.status();
        match status.as_u16() {
            404 => {
                return Err(ApiError::NotFound {
                    path: path.to_string(),
                })
            }
            401 | 403 => {
                return Err(ApiError::Unauthorized {
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
            _ if !status.is_success() => {
                return Err(ApiError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body = response.text().await.map_err(|e| request_error(path, e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_address, serve_once, serve_silence};

    fn client(address: &str) -> RedfishHttpClient {
        RedfishHttpClient::new(
            &format!("http://{address}"),
            "admin",
            "secret",
            Duration::from_secs(2),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_url_for() {
        let client = RedfishHttpClient::new(
            "https://10.0.0.5/",
            "admin",
            "secret",
            Duration::from_secs(1),
            true,
        )
        .unwrap();
        assert_eq!(
            client.url_for("/rest/v1/Systems/1"),
            "https://10.0.0.5/rest/v1/Systems/1"
        );
        assert_eq!(
            client.url_for("rest/v1/Systems/1"),
            "https://10.0.0.5/rest/v1/Systems/1"
        );
        assert_eq!(
            client.url_for("https://other/rest/v1/x"),
            "https://other/rest/v1/x"
        );
    }

    #[tokio::test]
    async fn test_get_sends_basic_auth_and_decodes() {
        let (address, server) = serve_once(200, r#"{"Model": "ProLiant DL380 Gen9"}"#).await;

        let body = client(&address).get("/rest/v1/Systems/1").await.unwrap();
        assert_eq!(body["Model"], "ProLiant DL380 Gen9");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /rest/v1/systems/1 http/1.1"));
        // admin:secret
        assert!(request.contains("authorization: basic ywrtaw46c2vjcmv0"));
        assert!(request.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (address, _server) = serve_once(404, "{}").await;
        let err = client(&address)
            .get("/redfish/v1/Systems/1/Bios/Settings")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (address, _server) = serve_once(401, "{}").await;
        let err = client(&address).get("/rest/v1/Managers/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_server_error() {
        let (address, _server) = serve_once(500, "{}").await;
        let err = client(&address).get("/rest/v1/Managers/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (address, _server) = serve_once(200, "<html>login</html>").await;
        let err = client(&address).get("/rest/v1/Managers/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let address = closed_address().await;
        let err = client(&address).get("/rest/v1/Managers/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_timeout() {
        let (address, _server) = serve_silence().await;
        let client = RedfishHttpClient::new(
            &format!("http://{address}"),
            "admin",
            "secret",
            Duration::from_millis(200),
            false,
        )
        .unwrap();
        let err = client.get("/rest/v1/Chassis/1/Thermal").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }
}
