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

//! Recurring trigger for poll cycles

use crate::domain::{CycleReport, PollSchedule};
use crate::ports::TelemetryPollingService;
use std::future::Future;
use std::time::SystemTime;

/// Drives a polling service on a schedule until shutdown
pub struct PollScheduler {
    schedule: PollSchedule,
    run_at_startup: bool,
}

impl PollScheduler {
    pub fn new(schedule: PollSchedule, run_at_startup: bool) -> Self {
        Self {
            schedule,
            run_at_startup,
        }
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// Shutdown is only observed between cycles; a running cycle always
    /// completes. Returns the number of cycles that ran.
    pub async fn run<S>(&self, service: &dyn TelemetryPollingService, shutdown: S) -> usize
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0;

        if self.run_at_startup {
            log::info!("Running initial poll cycle");
            Self::log_report(&service.run_cycle().await);
            cycles += 1;
        }

        loop {
            let delay = self.schedule.delay_until_next(SystemTime::now());
            log::debug!("Next poll cycle in {:.1?}", delay);
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping scheduler after {} cycles", cycles);
                    return cycles;
                }
                _ = tokio::time::sleep(delay) => {
                    Self::log_report(&service.run_cycle().await);
                    cycles += 1;
                }
            }
        }
    }

    fn log_report(report: &CycleReport) {
        if report.skipped {
            log::warn!("Poll cycle skipped");
        } else if !report.failed_mappers().is_empty() {
            log::warn!(
                "Poll cycle completed with failed mappers: {}",
                report.failed_mappers().join(", ")
            );
        }
    }
}
