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

use crate::domain::{AlertEvent, NotifyError};
use crate::ports::Notifier;
use async_trait::async_trait;

/// Fallback channel writing alerts to the log when no message channel is set
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &AlertEvent) -> Result<(), NotifyError> {
        log::warn!("ALERT [{}] {}", alert.key, alert.message);
        Ok(())
    }
}
