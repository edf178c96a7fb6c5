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

//! Controller network identity from the manager Ethernet interface

use super::common::{expect_object, lookup, text_field};
use super::ResourceMapper;
use crate::domain::{FieldValue, MapperError, MapperOutput};
use crate::ports::ManagementApi;
use async_trait::async_trait;
use serde_json::Value;

pub const ETHERNET_INTERFACE_PATH: &str = "/rest/v1/Managers/1/EthernetInterfaces/1";

pub struct NetworkMapper;

#[async_trait]
impl ResourceMapper for NetworkMapper {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError> {
        let payload = api.get(ETHERNET_INTERFACE_PATH).await?;
        log::info!("Network data retrieved");
        expect_object(&payload, "EthernetInterface")?;
        Ok(map_network(&payload))
    }
}

/// Map the MAC address and the first IPv4 address
pub fn map_network(payload: &Value) -> MapperOutput {
    let mut output = MapperOutput::default();
    output.push_field(text_field(
        "network",
        "MACAddress",
        FieldValue::from_optional(lookup(payload, &["MACAddress"])),
    ));
    output.push_field(text_field(
        "network",
        "IPv4",
        FieldValue::from_optional(lookup(payload, &["IPv4", "0", "Address"])),
    ));
    output
}
