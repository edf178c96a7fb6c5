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

//! BIOS settings dump
//!
//! The settings resource is schema-less: every top-level key becomes its own
//! data point with a type inferred from the value. The `Attributes` object is
//! flattened exactly one level so each attribute is addressable on its own;
//! anything nested below an attribute is published as rendered text.

use super::common::{expect_object, sanitize_id};
use super::ResourceMapper;
use crate::domain::{
    DataPointMetadata, FieldValue, MappedField, MapperError, MapperOutput, ValueType,
};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const BIOS_SETTINGS_PATH: &str = "/redfish/v1/Systems/1/Bios/Settings";

/// Key whose object value is flattened into individual points
pub const ATTRIBUTES_KEY: &str = "Attributes";

/// Relative path of the optional text dump
pub const DUMP_ID: &str = "bios.SettingsDump";

pub struct BiosMapper {
    include_dump: bool,
}

impl BiosMapper {
    /// Create a BIOS mapper
    ///
    /// # Arguments
    /// * `include_dump` - Also publish all settings as one text point
    pub fn new(include_dump: bool) -> Self {
        Self { include_dump }
    }
}

#[async_trait]
impl ResourceMapper for BiosMapper {
    fn name(&self) -> &'static str {
        "bios"
    }

    fn optional(&self) -> bool {
        true
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(BIOS_SETTINGS_PATH).await?;
        let output = map_bios(&payload, self.include_dump)?;
        log::info!("BIOS settings retrieved ({} fields)", output.fields.len());
        Ok(output)
    }
}

/// Map a BIOS settings payload
pub fn map_bios(payload: &Value, include_dump: bool) -> Result<MapperOutput, MapperError> {
    expect_object(payload, "BIOS settings")?;
    let Value::Object(settings) = payload else {
        return Ok(MapperOutput::default());
    };

    let mut output = MapperOutput::default();
    let mut dump = String::from("BIOS settings:\n");

    for (key, value) in settings {
        if let (ATTRIBUTES_KEY, Value::Object(attributes)) = (key.as_str(), value) {
            dump.push_str(&format!("• {}:\n", key));
            for (attribute, attribute_value) in attributes {
                let field = attribute_field(attribute, attribute_value);
                dump.push_str(&format!("   - {}: {}\n", attribute, field.value.render()));
                output.push_field(field);
            }
            continue;
        }

        let field = setting_field(key, value);
        dump.push_str(&format!("• {}: {}\n", key, field.value.render()));
        output.push_field(field);
    }

    if include_dump {
        output.push_field(MappedField::new(
            DUMP_ID,
            DataPointMetadata::text("BIOS settings dump"),
            FieldValue::Text(dump),
        ));
    }

    Ok(output)
}

/// Top-level setting, typed as boolean, number, object, array or string
fn setting_field(key: &str, value: &Value) -> MappedField {
    let value = FieldValue::from_json(value);
    let value_type = value.value_type().unwrap_or(ValueType::String);
    MappedField::new(
        format!("bios.{}", sanitize_id(key)),
        DataPointMetadata::read_only(key, value_type, "text"),
        value,
    )
}

/// Flattened attribute, typed as boolean, number or string
fn attribute_field(key: &str, value: &Value) -> MappedField {
    let value = match FieldValue::from_json(value) {
        scalar @ (FieldValue::Boolean(_)
        | FieldValue::Number(_)
        | FieldValue::Text(_)
        | FieldValue::Unavailable) => scalar,
        nested => FieldValue::Text(nested.render()),
    };
    let value_type = value.value_type().unwrap_or(ValueType::String);
    MappedField::new(
        format!("bios.{}", sanitize_id(key)),
        DataPointMetadata::read_only(key, value_type, "text"),
        value,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use predicates::prelude::*;
    use serde_json::json;

    fn sample_settings() -> Value {
        json!({
            "@odata.id": "/redfish/v1/Systems/1/Bios/Settings/",
            "Name": "BIOS Current Settings",
            "Oem": {"Hpe": {"Links": {}}},
            "SettingsObject": ["a", "b"],
            "Attributes": {
                "BootMode": "Uefi",
                "ProcHyperthreading": "Enabled",
                "PowerOnDelay": 15,
                "EmbeddedSata": true,
                "Nested": {"Inner": 1}
            }
        })
    }

    #[test]
    fn test_attributes_flattened_one_level() {
        let output = map_bios(&sample_settings(), false).unwrap();

        assert!(output.field("bios.Attributes").is_none());
        assert_eq!(
            output.field("bios.BootMode").unwrap().value,
            FieldValue::from("Uefi")
        );

        let delay = output.field("bios.PowerOnDelay").unwrap();
        assert_eq!(delay.metadata.value_type, ValueType::Number);
        assert_eq!(delay.value, FieldValue::Number(15.0));

        let sata = output.field("bios.EmbeddedSata").unwrap();
        assert_eq!(sata.metadata.value_type, ValueType::Boolean);

        let nested = output.field("bios.Nested").unwrap();
        assert_eq!(nested.metadata.value_type, ValueType::String);
        assert_eq!(nested.value, FieldValue::from(r#"{"Inner":1}"#));
    }

    #[test]
    fn test_top_level_types_inferred() {
        let output = map_bios(&sample_settings(), false).unwrap();

        assert_eq!(
            output.field("bios.odata_id").unwrap().metadata.name,
            "@odata.id"
        );
        assert_eq!(
            output.field("bios.Oem").unwrap().metadata.value_type,
            ValueType::Object
        );
        assert_eq!(
            output.field("bios.SettingsObject").unwrap().metadata.value_type,
            ValueType::Array
        );
        assert_eq!(
            output.field("bios.Name").unwrap().metadata.value_type,
            ValueType::String
        );
        // 4 top-level keys besides Attributes + 5 attributes
        assert_eq!(output.fields.len(), 9);
    }

    #[test]
    fn test_dump_text() {
        let output = map_bios(&sample_settings(), true).unwrap();
        let dump = output.field(DUMP_ID).unwrap();
        let text = dump.value.render();

        assert_eq!(output.fields.len(), 10);
        assert!(predicate::str::starts_with("BIOS settings:\n").eval(&text));
        assert!(predicate::str::contains("• Attributes:\n").eval(&text));
        assert!(predicate::str::contains("   - PowerOnDelay: 15\n").eval(&text));
        assert!(predicate::str::contains("• Name: BIOS Current Settings\n").eval(&text));
    }

    #[test]
    fn test_non_object_attributes_is_plain_setting() {
        let output = map_bios(&json!({"Attributes": "locked"}), false).unwrap();
        assert_eq!(
            output.field("bios.Attributes").unwrap().value,
            FieldValue::from("locked")
        );
    }

    #[test]
    fn test_non_object_payload_is_schema_error() {
        assert!(matches!(
            map_bios(&json!(["unexpected"]), true),
            Err(MapperError::Schema(_))
        ));
    }
}
