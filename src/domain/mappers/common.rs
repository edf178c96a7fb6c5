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

//! Common extraction utilities and helper functions

use crate::domain::{DataPointMetadata, FieldValue, MappedField, MapperError, ValueType};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    pub static ref UNSAFE_ID_CHARS_RE: Regex = Regex::new(r"[^A-Za-z0-9_-]").unwrap();
}

/// Placeholder for missing parts of composite status strings
pub const NOT_AVAILABLE: &str = "n/a";

/// Turn a vendor label into a data point path segment
///
/// Trims whitespace, replaces every character outside `[A-Za-z0-9_-]` with
/// one `_` (runs are not collapsed), then strips trailing and leading `_`
/// and trailing `.`. Symbol-only input yields an empty string.
///
/// # Arguments
/// * `raw` - Label as reported by the controller (e.g., "CPU Fan #1")
///
/// # Returns
/// * Sanitized segment (e.g., "CPU_Fan__1")
pub fn sanitize_id(raw: &str) -> String {
    UNSAFE_ID_CHARS_RE
        .replace_all(raw.trim(), "_")
        .trim_end_matches('_')
        .trim_start_matches('_')
        .trim_end_matches('.')
        .to_string()
}

/// Walk a JSON document, tolerating absence at any depth
///
/// Segments index objects by key and arrays by position (`"0"`).
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Return the first path that resolves to a non-null value
///
/// Used for relations whose key casing differs between firmware revisions
/// (`links` vs `Links`).
pub fn lookup_first<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|found| !found.is_null())
}

/// String at `path`, if present and a string
pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

/// Render a scalar for a composite text, `n/a` when absent
pub fn text_or_na(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
        Some(other) => FieldValue::from_json(other).render(),
    }
}

/// Health and state of a resource's `Status` object, `n/a` for missing parts
pub fn health_and_state(resource: &Value) -> (String, String) {
    (
        text_or_na(lookup(resource, &["Status", "Health"])),
        text_or_na(lookup(resource, &["Status", "State"])),
    )
}

/// Combined `"<Health> / <State>"` status string
pub fn combined_status(health: &str, state: &str) -> String {
    format!("{} / {}", health, state)
}

/// Field of a numbered component (PSU, drive) whose type follows its value
///
/// Numeric readings are declared as numbers; everything else, including
/// composite strings and unavailable values, as strings.
pub fn component_field(prefix: &str, key: &str, value: FieldValue) -> MappedField {
    let value_type = match value {
        FieldValue::Number(_) => ValueType::Number,
        _ => ValueType::String,
    };
    let value = match value {
        FieldValue::Mapping(_) | FieldValue::Sequence(_) | FieldValue::Boolean(_) => {
            FieldValue::Text(value.render())
        }
        other => other,
    };
    MappedField::new(
        format!("{}.{}", prefix, sanitize_id(key)),
        DataPointMetadata::read_only(key, value_type, "text"),
        value,
    )
}

/// Plain text field named after its key
pub fn text_field(domain: &str, key: &str, value: FieldValue) -> MappedField {
    MappedField::new(
        format!("{}.{}", domain, sanitize_id(key)),
        DataPointMetadata::text(key),
        value,
    )
}

/// Reject payloads that are not JSON objects
pub fn expect_object(payload: &Value, resource: &str) -> Result<(), MapperError> {
    if payload.is_object() {
        Ok(())
    } else {
        Err(MapperError::Schema(format!(
            "{} payload is not a JSON object",
            resource
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("CPU Fan #1"), "CPU_Fan__1");
        assert_eq!(sanitize_id("  01-Inlet Ambient  "), "01-Inlet_Ambient");
        assert_eq!(sanitize_id("PSU 1."), "PSU_1");
        assert_eq!(sanitize_id("__Fan__"), "Fan");
        assert_eq!(sanitize_id("Temp (°C)"), "Temp___C");
        assert_eq!(sanitize_id("!!!"), "");
        assert_eq!(sanitize_id(""), "");
        assert_eq!(sanitize_id("already_safe-ID"), "already_safe-ID");
    }

    #[test]
    fn test_sanitize_id_properties() {
        let samples = [
            "CPU Fan #1",
            " ~Drive Bay 3~ ",
            "P1 DIMM 1-6",
            "Système ventilé",
            "a.b.c",
            "___",
            "x\ty\nz",
        ];
        for raw in samples {
            let sanitized = sanitize_id(raw);
            assert!(sanitized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
            assert!(!sanitized.starts_with('_'));
            assert!(!sanitized.ends_with('_'));
            assert_eq!(sanitized, sanitize_id(raw));
        }
    }

    #[test]
    fn test_lookup_nested() {
        let payload = json!({
            "Bios": {"Current": {"VersionString": "P89 v2.76"}},
            "PowerControl": [{"PowerConsumedWatts": 142}]
        });
        assert_eq!(
            lookup_str(&payload, &["Bios", "Current", "VersionString"]),
            Some("P89 v2.76")
        );
        assert_eq!(
            lookup(&payload, &["PowerControl", "0", "PowerConsumedWatts"]),
            Some(&json!(142))
        );
        assert!(lookup(&payload, &["PowerControl", "1", "PowerConsumedWatts"]).is_none());
        assert!(lookup(&payload, &["Bios", "Current", "Missing", "Deeper"]).is_none());
        assert!(lookup(&json!("scalar"), &["anything"]).is_none());
    }

    #[test]
    fn test_lookup_first_falls_back() {
        let lower = json!({"links": {"PhysicalDrives": {"href": "/a"}}});
        let upper = json!({"Links": {"PhysicalDrives": {"href": "/b"}}});
        let paths: &[&[&str]] = &[
            &["links", "PhysicalDrives", "href"],
            &["Links", "PhysicalDrives", "href"],
        ];
        assert_eq!(lookup_first(&lower, paths), Some(&json!("/a")));
        assert_eq!(lookup_first(&upper, paths), Some(&json!("/b")));
        assert!(lookup_first(&json!({}), paths).is_none());
    }

    #[test]
    fn test_health_and_state() {
        let psu = json!({"Status": {"Health": "OK"}});
        assert_eq!(
            health_and_state(&psu),
            ("OK".to_string(), NOT_AVAILABLE.to_string())
        );
        assert_eq!(combined_status("Degraded", "Enabled"), "Degraded / Enabled");
    }

    #[test]
    fn test_component_field_typing() {
        let numeric =
            component_field("power.PSU_1", "PowerCapacityWatts", FieldValue::Number(800.0));
        assert_eq!(numeric.id, "power.PSU_1.PowerCapacityWatts");
        assert_eq!(numeric.metadata.value_type, ValueType::Number);

        let status = component_field("power.PSU_1", "Status", FieldValue::from("OK / Enabled"));
        assert_eq!(status.metadata.value_type, ValueType::String);

        let missing = component_field("power.PSU_1", "Name", FieldValue::Unavailable);
        assert_eq!(missing.metadata.value_type, ValueType::String);
        assert!(missing.value.is_unavailable());
        assert!(!missing.metadata.write);
    }

    #[test]
    fn test_expect_object() {
        assert!(expect_object(&json!({}), "Thermal").is_ok());
        assert!(matches!(
            expect_object(&json!([1]), "Thermal"),
            Err(MapperError::Schema(_))
        ));
    }
}
