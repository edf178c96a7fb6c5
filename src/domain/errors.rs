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

use thiserror::Error;

/// Errors raised while talking to the management controller
///
/// A 404 is kept apart from other status codes because optional resources
/// (BIOS settings, physical drives) answer it on firmware that lacks them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// DNS, connect or other I/O failure
    #[error("Transport error: {0}")]
    Transport(String),
    /// Request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// Resource does not exist on this controller
    #[error("Resource not found: {path}")]
    NotFound { path: String },
    /// Credentials were rejected
    #[error("Authentication rejected for {path} (HTTP {status})")]
    Unauthorized { path: String, status: u16 },
    /// Any other non-2xx answer
    #[error("Unexpected HTTP {status} for {path}")]
    Status { path: String, status: u16 },
    /// Body was not valid JSON
    #[error("Malformed JSON body: {0}")]
    Decode(String),
    /// Client could not be constructed
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// True when the controller answered HTTP 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Errors that abort a single resource mapper
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MapperError {
    /// Fetching a resource failed
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Response arrived but its shape was unusable
    #[error("Unexpected payload shape: {0}")]
    Schema(String),
}

impl MapperError {
    /// True when the underlying fetch answered HTTP 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, MapperError::Api(err) if err.is_not_found())
    }
}

/// Errors returned by a state sink for one declare/publish call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// Path is empty or contains characters the store does not accept
    #[error("Invalid data point path '{0}'")]
    InvalidPath(String),
    /// Value does not match the declared primitive type
    #[error("Type mismatch for '{path}': declared {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    /// Store could not be reached
    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while delivering an alert to one channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Channel could not be reached
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
    /// Channel answered with an error status
    #[error("Notification rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    /// Channel is not usable with the given settings
    #[error("Invalid notification channel configuration: {0}")]
    Configuration(String),
}

impl From<SinkError> for NotifyError {
    fn from(err: SinkError) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file is not valid TOML for the expected layout
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A setting has an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    /// Poll schedule expression is not supported
    #[error("Unsupported poll schedule '{0}'")]
    InvalidSchedule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let not_found = ApiError::NotFound {
            path: "/redfish/v1/Systems/1/Bios/Settings".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(MapperError::from(not_found).is_not_found());

        let refused = ApiError::Transport("connection refused".to_string());
        assert!(!refused.is_not_found());
        assert!(!MapperError::from(refused).is_not_found());
        assert!(!MapperError::Schema("missing".to_string()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = ApiError::Status {
            path: "/rest/v1/Chassis/1/Power".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "Unexpected HTTP 500 for /rest/v1/Chassis/1/Power");

        let mapper_err = MapperError::from(err.clone());
        assert_eq!(mapper_err.to_string(), err.to_string());

        let sink_err = SinkError::TypeMismatch {
            path: "bmc.fans.Fan1".to_string(),
            expected: "number".to_string(),
            actual: "string".to_string(),
        };
        assert_eq!(
            NotifyError::from(sink_err).to_string(),
            "Notification delivery failed: Type mismatch for 'bmc.fans.Fan1': declared number, got string"
        );
    }
}
