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

//! Secondary ports, implemented by adapters

pub mod config;
pub mod management_api;
pub mod notifier;
pub mod snapshot;
pub mod state_sink;

pub use config::*;
pub use management_api::*;
pub use notifier::*;
pub use snapshot::*;
pub use state_sink::*;
