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

//! Spoken announcements through a device command data point

use crate::domain::{AlertEvent, FieldValue, NotifyError};
use crate::ports::{Notifier, StateSink};
use async_trait::async_trait;
use std::sync::Arc;

/// Speaks alerts by writing their spoken text to a speaker's command point
///
/// The write is unacknowledged: it is a command for the device adapter
/// that owns the point, not a reading.
pub struct SpeechNotifier {
    sink: Arc<dyn StateSink>,
    command_path: String,
}

impl SpeechNotifier {
    pub fn new(sink: Arc<dyn StateSink>, command_path: &str) -> Self {
        Self {
            sink,
            command_path: command_path.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for SpeechNotifier {
    fn channel(&self) -> &str {
        "speech"
    }

    async fn notify(&self, alert: &AlertEvent) -> Result<(), NotifyError> {
        self.sink
            .publish(
                &self.command_path,
                FieldValue::Text(alert.spoken.clone()),
                false,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStateSink;
    use crate::domain::AlertKind;

    const SPEAK: &str = "alexa2.0.Echo-Devices.G090XX.Commands.speak";

    fn alert() -> AlertEvent {
        AlertEvent {
            kind: AlertKind::PowerSupply,
            key: "power_supply:2".to_string(),
            message: "⚠️ Power supply PSU 2 reports status: Degraded / Enabled".to_string(),
            spoken: "Warning! Power supply 2 has reached status Degraded / Enabled.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_speaks_unacknowledged() {
        let sink = Arc::new(InMemoryStateSink::new());
        let notifier = SpeechNotifier::new(sink.clone(), SPEAK);

        notifier.notify(&alert()).await.unwrap();

        let point = sink.get(SPEAK).await.unwrap();
        assert_eq!(point.value, FieldValue::from(alert().spoken));
        assert!(!point.acknowledged);
    }

    #[tokio::test]
    async fn test_invalid_command_path() {
        let sink = Arc::new(InMemoryStateSink::new());
        let notifier = SpeechNotifier::new(sink, "not a path");
        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotifyError::Delivery(_))
        ));
    }
}
