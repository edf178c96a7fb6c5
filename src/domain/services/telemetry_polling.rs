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

//! Poll cycle orchestration

use super::alerting::{AlertDispatcher, AlertEvaluator};
use crate::domain::{
    CycleReport, DataPointConfig, FieldValue, MappedField, MapperOutcome, MapperReport,
    ResourceMapper,
};
use crate::ports::{ManagementApi, SnapshotRepository, StateSink, TelemetryPollingService};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Domain service that runs every resource mapper and publishes the results
///
/// Mappers run sequentially in their configured order. A mapper that fails
/// is reported and the cycle moves on to the next one; a field the sink
/// rejects is counted and the mapper moves on to the next field.
pub struct TelemetryPoller {
    api: Arc<dyn ManagementApi>,
    sink: Arc<dyn StateSink>,
    mappers: Vec<Box<dyn ResourceMapper>>,
    datapoints: DataPointConfig,
    evaluator: AlertEvaluator,
    dispatcher: AlertDispatcher,
    snapshots: Option<Arc<dyn SnapshotRepository>>,
    /// Held for the duration of a cycle
    cycle_lock: Mutex<()>,
}

impl TelemetryPoller {
    /// Create a poller
    ///
    /// # Arguments
    /// * `api` - Management controller client
    /// * `sink` - State store receiving declarations and values
    /// * `mappers` - Mappers in execution order
    /// * `datapoints` - Path prefix settings
    /// * `evaluator` - Alert rules
    /// * `dispatcher` - Alert channels
    pub fn new(
        api: Arc<dyn ManagementApi>,
        sink: Arc<dyn StateSink>,
        mappers: Vec<Box<dyn ResourceMapper>>,
        datapoints: DataPointConfig,
        evaluator: AlertEvaluator,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            api,
            sink,
            mappers,
            datapoints,
            evaluator,
            dispatcher,
            snapshots: None,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Persist the sink's snapshot after every completed cycle
    pub fn with_snapshots(mut self, repository: Arc<dyn SnapshotRepository>) -> Self {
        self.snapshots = Some(repository);
        self
    }

    /// Declare and publish each field, returning (published, failed)
    async fn publish_fields(&self, fields: &[MappedField]) -> (usize, usize) {
        let mut published = 0;
        let mut failed = 0;

        for field in fields {
            let path = self.datapoints.full_path(&field.id);
            // A missing first value leaves the type for the sink to settle
            let default = if field.value.is_unavailable() {
                FieldValue::Unavailable
            } else {
                field.metadata.value_type.default_value()
            };
            let result = async {
                let created = self
                    .sink
                    .declare(&path, default, field.metadata.clone())
                    .await?;
                if created {
                    log::debug!("Declared {} ({})", path, field.metadata.value_type);
                }
                self.sink.publish(&path, field.value.clone(), true).await
            }
            .await;

            match result {
                Ok(()) => {
                    log::debug!("Published {} = {}", path, field.value.render());
                    published += 1;
                }
                Err(e) => {
                    log::warn!("Failed to publish {}: {}", path, e);
                    failed += 1;
                }
            }
        }

        (published, failed)
    }

    async fn run_mapper(&self, mapper: &dyn ResourceMapper, report: &mut CycleReport) {
        let name = mapper.name();
        let (outcome, alerts) = match mapper.collect(self.api.as_ref()).await {
            Ok(output) => {
                let (published, failed) = self.publish_fields(&output.fields).await;
                report.points_published += published;
                report.field_failures += failed;

                let alerts = self.evaluator.evaluate(name, &output.observations);
                for alert in &alerts {
                    report.alerts_dispatched += self.dispatcher.dispatch(alert).await;
                }
                (MapperOutcome::Completed { published, failed }, alerts.len())
            }
            Err(e) if e.is_not_found() && mapper.optional() => (
                MapperOutcome::Unsupported(format!("not supported by this controller: {}", e)),
                0,
            ),
            Err(e) => (MapperOutcome::Failed(e.to_string()), 0),
        };

        match &outcome {
            MapperOutcome::Completed { published, failed } => log::log!(
                outcome.log_level(),
                "Mapper {}: {} points published, {} rejected",
                name,
                published,
                failed
            ),
            MapperOutcome::Unsupported(reason) | MapperOutcome::Failed(reason) => {
                log::log!(outcome.log_level(), "Mapper {}: {}", name, reason)
            }
        }

        report.mappers.push(MapperReport {
            mapper: name,
            outcome,
            alerts,
        });
    }

    async fn save_snapshot(&self) {
        let Some(repository) = &self.snapshots else {
            return;
        };
        let result = match self.sink.snapshot().await {
            Ok(points) => repository.save_snapshot(&points).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => log::debug!("Snapshot written to {}", repository.location()),
            Err(e) => log::warn!("Failed to write snapshot to {}: {}", repository.location(), e),
        }
    }
}

#[async_trait]
impl TelemetryPollingService for TelemetryPoller {
    async fn run_cycle(&self) -> CycleReport {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            log::warn!("Previous poll cycle still running, skipping this trigger");
            return CycleReport::skipped();
        };

        let started = Instant::now();
        log::info!("Starting poll cycle ({} mappers)", self.mappers.len());

        let mut report = CycleReport::default();
        for mapper in &self.mappers {
            self.run_mapper(mapper.as_ref(), &mut report).await;
        }
        self.save_snapshot().await;

        log::info!(
            "Poll cycle finished in {:.1?}: {} published, {} rejected, {} alerts, {} failed mappers",
            started.elapsed(),
            report.points_published,
            report.field_failures,
            report.alerts_dispatched,
            report.failed_mappers().len()
        );
        report
    }

    fn mapper_names(&self) -> Vec<&'static str> {
        self.mappers.iter().map(|mapper| mapper.name()).collect()
    }
}
