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

//! Controller firmware from the manager resource

use super::common::{expect_object, lookup, lookup_str, text_field};
use super::ResourceMapper;
use crate::domain::{FieldValue, MapperError, MapperOutput};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const MANAGER_PATH: &str = "/rest/v1/Managers/1";

pub struct FirmwareMapper;

#[async_trait]
impl ResourceMapper for FirmwareMapper {
    fn name(&self) -> &'static str {
        "firmware"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(MANAGER_PATH).await?;
        log::info!("Firmware data retrieved");
        expect_object(&payload, "Manager")?;
        Ok(map_firmware(&payload))
    }
}

/// Map the controller firmware version, and its date when reported as text
pub fn map_firmware(payload: &Value) -> MapperOutput {
    let mut output = MapperOutput::default();
    output.push_field(text_field(
        "firmware",
        "iLOFirmwareVersion",
        FieldValue::from_optional(lookup(payload, &["Firmware", "Current", "VersionString"])),
    ));
    if let Some(date) = lookup_str(payload, &["Firmware", "Current", "Date"]) {
        output.push_field(text_field("firmware", "iLODate", FieldValue::from(date)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_firmware() {
        let payload = json!({
            "Firmware": {"Current": {"VersionString": "iLO 4 v2.81", "Date": "Jun 03 2025"}}
        });
        let output = map_firmware(&payload);
        assert_eq!(output.fields.len(), 2);
        assert_eq!(
            output.field("firmware.iLOFirmwareVersion").unwrap().value,
            FieldValue::from("iLO 4 v2.81")
        );
        assert_eq!(
            output.field("firmware.iLODate").unwrap().value,
            FieldValue::from("Jun 03 2025")
        );
    }

    #[test]
    fn test_non_string_date_is_omitted() {
        let payload = json!({"Firmware": {"Current": {"VersionString": "2.81", "Date": 20250603}}});
        let output = map_firmware(&payload);
        assert_eq!(output.fields.len(), 1);
        assert!(output.field("firmware.iLODate").is_none());
    }

    #[test]
    fn test_missing_firmware_block() {
        let output = map_firmware(&json!({}));
        assert_eq!(output.fields.len(), 1);
        assert!(output.fields[0].value.is_unavailable());
    }
}
