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

//! Physical drives and logical (RAID) drives behind the array controller
//!
//! Both are discovered in two hops: the controller resource links to a drive
//! collection, whose members are then fetched one by one.

use super::common::{
    combined_status, component_field, expect_object, health_and_state, lookup, lookup_first,
    text_or_na,
};
use super::ResourceMapper;
use crate::domain::{DataPointMetadata, FieldValue, MappedField, MapperError, MapperOutput};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const ARRAY_CONTROLLER_PATH: &str = "/rest/v1/Systems/1/SmartStorage/ArrayControllers/0";

pub const PHYSICAL_DRIVES_RELATION: &str = "PhysicalDrives";
pub const LOGICAL_DRIVES_RELATION: &str = "LogicalDrives";

/// Resolve a relation link, trying `links` before `Links`
pub fn relation_link(controller: &Value, relation: &str) -> Option<String> {
    lookup_first(
        controller,
        &[&["links", relation, "href"], &["Links", relation, "href"]],
    )
    .and_then(Value::as_str)
    .map(str::to_string)
}

/// Member resource paths of a collection, in listed order
pub fn member_links(collection: &Value) -> Vec<String> {
    let members = lookup_first(
        collection,
        &[&["Members"], &["links", "Member"], &["Links", "Member"]],
    )
    .and_then(Value::as_array);

    members
        .map(|members| {
            members
                .iter()
                .filter_map(|member| {
                    lookup_first(member, &[&["@odata.id"], &["href"]]).and_then(Value::as_str)
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetch every member of a linked collection
///
/// A member whose fetch fails is logged and skipped; its position still
/// counts so the numbering of the remaining drives stays stable.
async fn fetch_members(
    api: &dyn ManagementApi,
    collection_link: &str,
    kind: &str,
) -> Result<Vec<(usize, Value)>, MapperError> {
    let collection = api.get(collection_link).await?;
    let mut members = Vec::new();
    for (position, link) in member_links(&collection).iter().enumerate() {
        match api.get(link).await {
            Ok(member) => members.push((position + 1, member)),
            Err(e) => log::warn!("Skipping {} {} ({}): {}", kind, position + 1, link, e),
        }
    }
    Ok(members)
}

pub struct PhysicalDiskMapper;

#[async_trait]
impl ResourceMapper for PhysicalDiskMapper {
    fn name(&self) -> &'static str {
        "disks"
    }

    fn optional(&self) -> bool {
        true
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let controller = api.get(ARRAY_CONTROLLER_PATH).await?;
        log::info!("Array controller data retrieved for physical drives");
        expect_object(&controller, "ArrayController")?;

        let mut output = MapperOutput::default();
        let Some(link) = relation_link(&controller, PHYSICAL_DRIVES_RELATION) else {
            log::warn!("No PhysicalDrives link found on the array controller");
            return Ok(output);
        };

        for (index, drive) in fetch_members(api, &link, "physical drive").await? {
            output.fields.extend(map_physical_drive(index, &drive));
        }
        Ok(output)
    }
}

/// Map one physical drive into `disks.Drive_<n>.*`
pub fn map_physical_drive(index: usize, drive: &Value) -> Vec<MappedField> {
    let prefix = format!("disks.Drive_{}", index);
    let (health, state) = health_and_state(drive);
    vec![
        component_field(&prefix, "Location", FieldValue::from_optional(drive.get("Location"))),
        component_field(&prefix, "Model", FieldValue::from_optional(drive.get("Model"))),
        component_field(
            &prefix,
            "CapacityMiB",
            FieldValue::from_optional(drive.get("CapacityMiB")),
        ),
        component_field(
            &prefix,
            "Status",
            FieldValue::Text(combined_status(&health, &state)),
        ),
    ]
}

pub struct RaidMapper;

#[async_trait]
impl ResourceMapper for RaidMapper {
    fn name(&self) -> &'static str {
        "raid"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let controller = api.get(ARRAY_CONTROLLER_PATH).await?;
        log::info!("Array controller data retrieved for RAID configuration");
        expect_object(&controller, "ArrayController")?;

        let mut output = MapperOutput::default();
        output.push_field(raid_configuration(&controller));

        let Some(link) = relation_link(&controller, LOGICAL_DRIVES_RELATION) else {
            log::warn!("No LogicalDrives link found on the array controller");
            return Ok(output);
        };

        for (index, drive) in fetch_members(api, &link, "logical drive").await? {
            output.fields.extend(map_logical_drive(index, &drive));
        }
        Ok(output)
    }
}

/// Controller summary as one text point
pub fn raid_configuration(controller: &Value) -> MappedField {
    let summary = format!(
        "Model: {}\nFirmware: {}\nStatus: {}",
        text_or_na(controller.get("Model")),
        text_or_na(lookup_first(
            controller,
            &[&["FirmwareVersion", "Current", "VersionString"], &["FirmwareVersion"]],
        )),
        text_or_na(lookup(controller, &["Status", "Health"])),
    );
    MappedField::new(
        "raid.Configuration",
        DataPointMetadata::text("RAID configuration"),
        FieldValue::Text(summary),
    )
}

/// Map one logical drive into `smart.LogicalDrive_<n>.*`
pub fn map_logical_drive(index: usize, drive: &Value) -> Vec<MappedField> {
    let prefix = format!("smart.LogicalDrive_{}", index);
    let (health, state) = health_and_state(drive);
    vec![
        component_field(&prefix, "RaidLevel", FieldValue::from_optional(drive.get("Raid"))),
        component_field(
            &prefix,
            "CapacityMiB",
            FieldValue::from_optional(drive.get("CapacityMiB")),
        ),
        component_field(
            &prefix,
            "Status",
            FieldValue::Text(combined_status(&health, &state)),
        ),
    ]
}
