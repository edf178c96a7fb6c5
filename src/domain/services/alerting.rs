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

//! Threshold rules over mapper observations and fan-out to notifiers

use crate::domain::{format_number, AlertEvent, AlertKind, AlertMode, Observation};
use crate::ports::Notifier;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Evaluates alert rules against the observations of one mapper
pub struct AlertEvaluator {
    cpu_temperature_limit: f64,
    mode: AlertMode,
    /// Conditions in violation per observation source, only tracked in transition mode
    active: Mutex<HashMap<String, HashSet<String>>>,
}

impl AlertEvaluator {
    /// Create an evaluator
    ///
    /// # Arguments
    /// * `cpu_temperature_limit` - Readings strictly above this fire a CPU alert
    /// * `mode` - Whether a persisting violation alerts every cycle or only once
    pub fn new(cpu_temperature_limit: f64, mode: AlertMode) -> Self {
        Self {
            cpu_temperature_limit,
            mode,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Alerts raised by the latest batch of observations from `source`
    ///
    /// In transition mode a condition alerts when it enters violation. It
    /// re-arms as soon as a batch from the same source no longer reports it in
    /// violation, whether the reading is back within limits or the sensor was
    /// not observed at all.
    pub fn evaluate(&self, source: &str, observations: &[Observation]) -> Vec<AlertEvent> {
        let violations = observations
            .iter()
            .filter_map(|observation| self.check(observation));

        match self.mode {
            AlertMode::EveryCycle => violations.collect(),
            AlertMode::OnTransition => {
                let mut active = match self.active.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let previous = active.remove(source).unwrap_or_default();
                let mut current = HashSet::new();
                let mut alerts = Vec::new();
                for alert in violations {
                    if current.insert(alert.key.clone()) && !previous.contains(&alert.key) {
                        alerts.push(alert);
                    }
                }
                active.insert(source.to_string(), current);
                alerts
            }
        }
    }

    fn check(&self, observation: &Observation) -> Option<AlertEvent> {
        match observation {
            Observation::Temperature {
                sensor,
                physical_context,
                reading,
            } => {
                let key = format!("temperature:{}", sensor);
                let violated =
                    physical_context.contains("CPU") && *reading > self.cpu_temperature_limit;
                violated.then(|| AlertEvent {
                    kind: AlertKind::CpuTemperature,
                    key,
                    message: format!(
                        "⚠️ CPU temperature \"{}\" = {} °C (limit: {} °C)",
                        sensor,
                        format_number(*reading),
                        format_number(self.cpu_temperature_limit)
                    ),
                    spoken: format!(
                        "Warning! The temperature of {} is {} degrees.",
                        sensor,
                        format_number(*reading)
                    ),
                })
            }
            Observation::PowerSupply {
                index,
                health,
                state,
            } => {
                let key = format!("power_supply:{}", index);
                let violated = health != "OK" || state != "Enabled";
                violated.then(|| {
                    let status = format!("{} / {}", health, state);
                    AlertEvent {
                        kind: AlertKind::PowerSupply,
                        key,
                        message: format!(
                            "⚠️ Power supply PSU {} reports status: {}",
                            index, status
                        ),
                        spoken: format!(
                            "Warning! Power supply {} has reached status {}.",
                            index, status
                        ),
                    }
                })
            }
        }
    }
}

/// Sends alerts to every configured channel
pub struct AlertDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl AlertDispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn channels(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    /// Deliver one alert to each channel in turn
    ///
    /// Returns the number of successful deliveries. A failing channel is
    /// logged and does not stop the others.
    pub async fn dispatch(&self, alert: &AlertEvent) -> usize {
        if self.notifiers.is_empty() {
            log::warn!("No notification channel configured: {}", alert.message);
            return 0;
        }

        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.notify(alert).await {
                Ok(()) => {
                    log::debug!("Alert {} delivered via {}", alert.key, notifier.channel());
                    delivered += 1;
                }
                Err(e) => log::warn!(
                    "Failed to deliver alert {} via {}: {}",
                    alert.key,
                    notifier.channel(),
                    e
                ),
            }
        }
        delivered
    }
}
