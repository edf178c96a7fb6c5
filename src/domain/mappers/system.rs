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

//! System identification from the computer system resource

use super::common::{expect_object, lookup, text_field};
use super::ResourceMapper;
use crate::domain::{FieldValue, MapperError, MapperOutput};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const SYSTEM_PATH: &str = "/rest/v1/Systems/1";

pub struct SystemInfoMapper;

#[async_trait]
impl ResourceMapper for SystemInfoMapper {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(SYSTEM_PATH).await?;
        log::info!("System data retrieved");
        expect_object(&payload, "System")?;
        Ok(map_system(&payload))
    }
}

/// Map model, serial number and BIOS version
pub fn map_system(payload: &Value) -> MapperOutput {
    let fields = [
        ("Model", lookup(payload, &["Model"])),
        ("SerialNumber", lookup(payload, &["SerialNumber"])),
        (
            "BIOSVersion",
            lookup(payload, &["Bios", "Current", "VersionString"]),
        ),
    ];

    let mut output = MapperOutput::default();
    for (key, value) in fields {
        output.push_field(text_field("system", key, FieldValue::from_optional(value)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_system() {
        let payload = json!({
            "Model": "ProLiant DL380 Gen9",
            "SerialNumber": "CZJ1234567",
            "Bios": {"Current": {"VersionString": "P89 v2.76 (10/21/2019)"}}
        });
        let output = map_system(&payload);
        assert_eq!(output.fields.len(), 3);
        assert_eq!(
            output.field("system.Model").unwrap().value,
            FieldValue::from("ProLiant DL380 Gen9")
        );
        assert_eq!(
            output.field("system.BIOSVersion").unwrap().value,
            FieldValue::from("P89 v2.76 (10/21/2019)")
        );
        assert_eq!(output.field("system.SerialNumber").unwrap().metadata.role, "text");
    }

    #[test]
    fn test_missing_bios_nesting_is_unavailable() {
        let payload = json!({"Model": "DL360", "Bios": {}});
        let output = map_system(&payload);
        assert!(output.field("system.BIOSVersion").unwrap().value.is_unavailable());
        assert!(output.field("system.SerialNumber").unwrap().value.is_unavailable());
    }
}
