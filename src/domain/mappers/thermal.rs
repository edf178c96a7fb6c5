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

//! Temperature sensors and fans from the chassis thermal resource

use super::common::{expect_object, lookup_str, sanitize_id};
use super::ResourceMapper;
use crate::domain::{
    DataPointMetadata, FieldValue, MappedField, MapperError, MapperOutput, Observation, ValueType,
};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const THERMAL_PATH: &str = "/rest/v1/Chassis/1/Thermal";

pub struct ThermalMapper;

#[async_trait]
impl ResourceMapper for ThermalMapper {
    fn name(&self) -> &'static str {
        "thermal"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(THERMAL_PATH).await?;
        log::info!("Thermal data retrieved");
        expect_object(&payload, "Thermal")?;
        Ok(map_thermal(&payload))
    }
}

/// Map a thermal payload into temperature and fan points
///
/// Only readings above zero count as valid temperatures; sensors without a
/// reading or reporting 0 are skipped entirely. Fans are always published.
pub fn map_thermal(payload: &Value) -> MapperOutput {
    let mut output = MapperOutput::default();

    if let Some(temperatures) = payload.get("Temperatures").and_then(Value::as_array) {
        for sensor in temperatures {
            let reading = match sensor.get("CurrentReading").and_then(Value::as_f64) {
                Some(reading) if reading > 0.0 => reading,
                _ => continue,
            };
            let Some(name) = lookup_str(sensor, &["Name"]) else {
                log::warn!("Skipping temperature sensor without a name");
                continue;
            };
            let physical_context = lookup_str(sensor, &["PhysicalContext"]).unwrap_or_default();
            let display_name = if physical_context.is_empty() {
                name
            } else {
                physical_context
            };

            output.push_field(MappedField::new(
                format!("temperatures.{}", sanitize_id(name)),
                DataPointMetadata::read_only(display_name, ValueType::Number, "value.temperature")
                    .with_unit("°C"),
                FieldValue::Number(reading),
            ));
            output.push_observation(Observation::Temperature {
                sensor: name.to_string(),
                physical_context: physical_context.to_string(),
                reading,
            });
        }
    }

    if let Some(fans) = payload.get("Fans").and_then(Value::as_array) {
        for fan in fans {
            let Some(name) =
                lookup_str(fan, &["FanName"]).or_else(|| lookup_str(fan, &["Name"]))
            else {
                log::warn!("Skipping fan without a name");
                continue;
            };
            output.push_field(MappedField::new(
                format!("fans.{}", sanitize_id(name)),
                DataPointMetadata::read_only("Fan Speed", ValueType::Number, "value.speed")
                    .with_unit("%"),
                FieldValue::from_optional(fan.get("CurrentReading")),
            ));
        }
    }

    output
}
