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

//! Power consumption and power supply status from the chassis power resource

use super::common::{combined_status, component_field, expect_object, health_and_state, lookup};
use super::ResourceMapper;
use crate::domain::{
    DataPointMetadata, FieldValue, MappedField, MapperError, MapperOutput, Observation, ValueType,
};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const POWER_PATH: &str = "/rest/v1/Chassis/1/Power";

pub struct PowerMapper;

#[async_trait]
impl ResourceMapper for PowerMapper {
    fn name(&self) -> &'static str {
        "power"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(POWER_PATH).await?;
        log::info!("Power data retrieved");
        log::debug!(
            "Power payload: {}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
        expect_object(&payload, "Power")?;
        Ok(map_power(&payload))
    }
}

/// Map consumed watts and each power supply unit
pub fn map_power(payload: &Value) -> MapperOutput {
    let mut output = MapperOutput::default();

    let watts =
        lookup(payload, &["PowerControl", "0", "PowerConsumedWatts"]).and_then(Value::as_f64);
    match watts {
        Some(watts) if watts > 0.0 => output.push_field(MappedField::new(
            "power.PowerConsumedWatts",
            DataPointMetadata::read_only("Power consumption", ValueType::Number, "value.power")
                .with_unit("W"),
            FieldValue::Number(watts),
        )),
        _ => log::warn!("PowerConsumedWatts not available or zero"),
    }

    let Some(supplies) = payload.get("PowerSupplies").and_then(Value::as_array) else {
        log::warn!("No power supplies found or unexpected format");
        return output;
    };

    for (position, psu) in supplies.iter().enumerate() {
        let index = position + 1;
        let prefix = format!("power.PSU_{}", index);
        let (health, state) = health_and_state(psu);

        output.push_field(component_field(
            &prefix,
            "Name",
            FieldValue::from_optional(psu.get("Name")),
        ));
        output.push_field(component_field(
            &prefix,
            "Status",
            FieldValue::Text(combined_status(&health, &state)),
        ));
        output.push_field(component_field(
            &prefix,
            "PowerCapacityWatts",
            FieldValue::from_optional(psu.get("PowerCapacityWatts")),
        ));
        output.push_field(component_field(
            &prefix,
            "LastPowerOutputWatts",
            FieldValue::from_optional(psu.get("LastPowerOutputWatts")),
        ));
        output.push_observation(Observation::PowerSupply {
            index,
            health,
            state,
        });
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mappers::common::NOT_AVAILABLE;
    use serde_json::json;

    #[test]
    fn test_map_power() {
        let payload = json!({
            "PowerControl": [{"PowerConsumedWatts": 182}],
            "PowerSupplies": [
                {
                    "Name": "HpServerPowerSupply",
                    "PowerCapacityWatts": 500,
                    "LastPowerOutputWatts": 91,
                    "Status": {"Health": "OK", "State": "Enabled"}
                },
                {
                    "Name": "HpServerPowerSupply",
                    "PowerCapacityWatts": 500,
                    "LastPowerOutputWatts": 0,
                    "Status": {"Health": "Warning", "State": "Enabled"}
                }
            ]
        });

        let output = map_power(&payload);
        assert_eq!(output.fields.len(), 9);

        let watts = output.field("power.PowerConsumedWatts").unwrap();
        assert_eq!(watts.value, FieldValue::Number(182.0));
        assert_eq!(watts.metadata.unit.as_deref(), Some("W"));

        assert_eq!(
            output.field("power.PSU_2.Status").unwrap().value,
            FieldValue::from("Warning / Enabled")
        );
        let capacity = output.field("power.PSU_1.PowerCapacityWatts").unwrap();
        assert_eq!(capacity.metadata.value_type, ValueType::Number);
        assert_eq!(
            output.field("power.PSU_1.Name").unwrap().metadata.value_type,
            ValueType::String
        );

        assert_eq!(
            output.observations[1],
            Observation::PowerSupply {
                index: 2,
                health: "Warning".to_string(),
                state: "Enabled".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_watts_not_published() {
        let output = map_power(&json!({"PowerControl": [{"PowerConsumedWatts": 0}]}));
        assert!(output.field("power.PowerConsumedWatts").is_none());

        let output = map_power(&json!({"PowerControl": []}));
        assert!(output.fields.is_empty());
    }

    #[test]
    fn test_missing_status_parts() {
        let output = map_power(&json!({"PowerSupplies": [{"Name": "PSU"}]}));
        let expected = format!("{} / {}", NOT_AVAILABLE, NOT_AVAILABLE);
        assert_eq!(
            output.field("power.PSU_1.Status").unwrap().value,
            FieldValue::Text(expected)
        );
        assert!(output
            .field("power.PSU_1.PowerCapacityWatts")
            .unwrap()
            .value
            .is_unavailable());
    }
}
