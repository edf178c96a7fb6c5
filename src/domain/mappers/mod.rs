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

//! Resource mappers
//!
//! Each mapper fetches one controller resource (or a linked chain of them)
//! and turns the payload into typed fields plus the observations the alert
//! rules consume. Mappers are pure with respect to the state store; the
//! polling service owns declaration and publication.

pub mod bios;
pub mod common;
pub mod firmware;
pub mod network;
pub mod power;
pub mod storage;
pub mod system;
pub mod thermal;

pub use bios::BiosMapper;
pub use firmware::FirmwareMapper;
pub use network::NetworkMapper;
pub use power::PowerMapper;
pub use storage::{PhysicalDiskMapper, RaidMapper};
pub use system::SystemInfoMapper;
pub use thermal::ThermalMapper;

use crate::domain::{DataPointConfig, MapperError, MapperOutput};
use crate::ports::ManagementApi;
use async_trait::async_trait;

/// One independently failing unit of a poll cycle
#[async_trait]
pub trait ResourceMapper: Send + Sync {
    /// Short name used in logs and cycle reports
    fn name(&self) -> &'static str;

    /// Whether a missing resource (HTTP 404) is expected on some firmware
    fn optional(&self) -> bool {
        false
    }

    async fn collect(&self, api: &dyn ManagementApi) -> Result<MapperOutput, MapperError>;
}

/// The full mapper set, in publication order
pub fn default_mappers(datapoints: &DataPointConfig) -> Vec<Box<dyn ResourceMapper>> {
    vec![
        Box::new(ThermalMapper),
        Box::new(SystemInfoMapper),
        Box::new(PowerMapper),
        Box::new(FirmwareMapper),
        Box::new(NetworkMapper),
        Box::new(BiosMapper::new(datapoints.bios_dump)),
        Box::new(PhysicalDiskMapper),
        Box::new(RaidMapper),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapper_order() {
        let names: Vec<_> = default_mappers(&DataPointConfig::default())
            .iter()
            .map(|mapper| mapper.name())
            .collect();
        assert_eq!(
            names,
            vec!["thermal", "system", "power", "firmware", "network", "bios", "disks", "raid"]
        );
    }

    #[test]
    fn test_optional_mappers() {
        let optional: Vec<_> = default_mappers(&DataPointConfig::default())
            .iter()
            .filter(|mapper| mapper.optional())
            .map(|mapper| mapper.name())
            .collect();
        assert_eq!(optional, vec!["bios", "disks"]);
    }
}
