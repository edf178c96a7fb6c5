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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Primitive type of a data point as understood by the state store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    /// Only produced by the BIOS settings dump
    Object,
    /// Only produced by the BIOS settings dump
    Array,
}

impl ValueType {
    /// Value a point of this type holds before its first publication
    pub fn default_value(&self) -> FieldValue {
        match self {
            ValueType::Number => FieldValue::Number(0.0),
            ValueType::String => FieldValue::Text(String::new()),
            ValueType::Boolean => FieldValue::Boolean(false),
            ValueType::Object => FieldValue::Mapping(Map::new()),
            ValueType::Array => FieldValue::Sequence(Vec::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// A value extracted from a Redfish payload
///
/// `Unavailable` stands for a field that was absent at some nesting depth.
/// It is still published so the point exists, but carries no reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
    Unavailable,
}

impl FieldValue {
    /// Convert a raw JSON value, mapping `null` to `Unavailable`
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Unavailable,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Object(map) => FieldValue::Mapping(map.clone()),
            Value::Array(items) => FieldValue::Sequence(items.clone()),
        }
    }

    /// Like [`FieldValue::from_json`] for an optional lookup result
    pub fn from_optional(value: Option<&Value>) -> Self {
        value.map(Self::from_json).unwrap_or(FieldValue::Unavailable)
    }

    /// Primitive type carried by this value, `None` when unavailable
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            FieldValue::Boolean(_) => Some(ValueType::Boolean),
            FieldValue::Number(_) => Some(ValueType::Number),
            FieldValue::Text(_) => Some(ValueType::String),
            FieldValue::Mapping(_) => Some(ValueType::Object),
            FieldValue::Sequence(_) => Some(ValueType::Array),
            FieldValue::Unavailable => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FieldValue::Unavailable)
    }

    /// Human readable rendering used in dumps and alert texts
    pub fn render(&self) -> String {
        match self {
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Mapping(map) => Value::Object(map.clone()).to_string(),
            FieldValue::Sequence(items) => Value::Array(items.clone()).to_string(),
            FieldValue::Unavailable => "n/a".to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Format a reading without a trailing `.0` for whole numbers
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Declaration metadata of a data point, fixed by its first declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPointMetadata {
    /// Display name
    pub name: String,
    /// Physical unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Primitive type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Role/category hint for the state store
    pub role: String,
    pub read: bool,
    pub write: bool,
}

impl DataPointMetadata {
    /// Metadata of a read-only point, the only kind this system declares
    pub fn read_only(name: impl Into<String>, value_type: ValueType, role: &str) -> Self {
        Self {
            name: name.into(),
            unit: None,
            value_type,
            role: role.to_string(),
            read: true,
            write: false,
        }
    }

    /// Read-only text point with role `text`
    pub fn text(name: impl Into<String>) -> Self {
        Self::read_only(name, ValueType::String, "text")
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// One field produced by a mapper, addressed relative to the configured prefix
#[derive(Debug, Clone, PartialEq)]
pub struct MappedField {
    /// Relative path such as `temperatures.CPU1`
    pub id: String,
    pub metadata: DataPointMetadata,
    pub value: FieldValue,
}

impl MappedField {
    pub fn new(id: impl Into<String>, metadata: DataPointMetadata, value: FieldValue) -> Self {
        Self {
            id: id.into(),
            metadata,
            value,
        }
    }
}

/// A mapped reading the alert evaluator inspects
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Valid (positive) temperature reading
    Temperature {
        sensor: String,
        physical_context: String,
        reading: f64,
    },
    /// Status of one power supply, 1-based index
    PowerSupply {
        index: usize,
        health: String,
        state: String,
    },
}

/// Everything one mapper extracted during a cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapperOutput {
    pub fields: Vec<MappedField>,
    pub observations: Vec<Observation>,
}

impl MapperOutput {
    pub fn push_field(&mut self, field: MappedField) {
        self.fields.push(field);
    }

    pub fn push_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Look up a field by its relative path
    pub fn field(&self, id: &str) -> Option<&MappedField> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// A data point as held by a state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Full path including the configured prefix
    pub path: String,
    /// `None` for points published without a declaration (foreign points)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataPointMetadata>,
    pub value: FieldValue,
    /// Whether the last update was a confirmed sensor reading
    pub acknowledged: bool,
}

/// Kind of alert condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    CpuTemperature,
    PowerSupply,
}

/// A transient notification about a threshold or status violation
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    /// Stable identity of the violated condition, e.g. `temperature:CPU1`
    pub key: String,
    /// Text for message channels
    pub message: String,
    /// Natural-language rendering for spoken channels
    pub spoken: String,
}

/// Result of one mapper within a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum MapperOutcome {
    /// Mapper ran; counts of published and rejected fields
    Completed { published: usize, failed: usize },
    /// Optional resource missing on this firmware (HTTP 404)
    Unsupported(String),
    /// Fetch or payload failure
    Failed(String),
}

impl MapperOutcome {
    /// Level at which the orchestrator reports this outcome
    pub fn log_level(&self) -> log::Level {
        match self {
            MapperOutcome::Completed { failed: 0, .. } => log::Level::Info,
            MapperOutcome::Completed { .. } => log::Level::Warn,
            MapperOutcome::Unsupported(_) => log::Level::Warn,
            MapperOutcome::Failed(_) => log::Level::Error,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MapperOutcome::Failed(_))
    }
}

/// Per-mapper entry of a cycle report
#[derive(Debug, Clone, PartialEq)]
pub struct MapperReport {
    pub mapper: &'static str,
    pub outcome: MapperOutcome,
    pub alerts: usize,
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Set when the trigger arrived while another cycle was running
    pub skipped: bool,
    pub mappers: Vec<MapperReport>,
    pub points_published: usize,
    pub field_failures: usize,
    pub alerts_dispatched: usize,
}

impl CycleReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Names of mappers that failed this cycle
    pub fn failed_mappers(&self) -> Vec<&'static str> {
        self.mappers
            .iter()
            .filter(|report| report.outcome.is_failed())
            .map(|report| report.mapper)
            .collect()
    }

    pub fn outcome_of(&self, mapper: &str) -> Option<&MapperOutcome> {
        self.mappers
            .iter()
            .find(|report| report.mapper == mapper)
            .map(|report| &report.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(&json!(42)), FieldValue::Number(42.0));
        assert_eq!(FieldValue::from_json(&json!("OK")), FieldValue::Text("OK".into()));
        assert_eq!(FieldValue::from_json(&json!(true)), FieldValue::Boolean(true));
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Unavailable);
        assert_eq!(
            FieldValue::from_json(&json!([1, 2])).value_type(),
            Some(ValueType::Array)
        );
        assert_eq!(
            FieldValue::from_json(&json!({"a": 1})).value_type(),
            Some(ValueType::Object)
        );
        assert_eq!(FieldValue::from_optional(None), FieldValue::Unavailable);
    }

    #[test]
    fn test_render() {
        assert_eq!(FieldValue::Number(75.0).render(), "75");
        assert_eq!(FieldValue::Number(12.5).render(), "12.5");
        assert_eq!(FieldValue::Unavailable.render(), "n/a");
        assert_eq!(FieldValue::from_json(&json!({"a": 1})).render(), r#"{"a":1}"#);
    }

    #[test]
    fn test_default_values_match_type() {
        for value_type in [
            ValueType::Number,
            ValueType::String,
            ValueType::Boolean,
            ValueType::Object,
            ValueType::Array,
        ] {
            assert_eq!(value_type.default_value().value_type(), Some(value_type));
        }
    }

    #[test]
    fn test_outcome_log_levels() {
        assert_eq!(
            MapperOutcome::Completed { published: 3, failed: 0 }.log_level(),
            log::Level::Info
        );
        assert_eq!(
            MapperOutcome::Unsupported("bios".into()).log_level(),
            log::Level::Warn
        );
        assert_eq!(
            MapperOutcome::Failed("refused".into()).log_level(),
            log::Level::Error
        );
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = DataPointMetadata::read_only("CPU", ValueType::Number, "value.temperature")
            .with_unit("°C");
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["type"], "number");
        assert_eq!(value["unit"], "°C");
        assert_eq!(value["write"], false);
    }
}
