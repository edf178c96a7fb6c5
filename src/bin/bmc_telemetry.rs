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

use bmc_telemetry::{
    ContainerConfig, CycleReport, MapperOutcome, ServiceContainer, TelemetryPollingService,
    TomlConfigurationProvider,
};
use bmc_telemetry::domain::SnapshotFormat;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bmc_telemetry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Poll a management controller and publish its telemetry as data points")]
struct Opt {
    /// Configuration file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Controller host, overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Controller user, overrides the configuration file
    #[arg(long)]
    username: Option<String>,

    /// Controller password
    #[arg(long, env = "BMC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Write the data point snapshot to this file (.json or .toml)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn snapshot_format(path: &Path) -> SnapshotFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => SnapshotFormat::Toml,
        _ => SnapshotFormat::Json,
    }
}

async fn build_container(opt: &Opt) -> Result<ServiceContainer, Box<dyn Error>> {
    let mut monitor = match &opt.config {
        Some(path) => {
            ServiceContainer::from_provider(&TomlConfigurationProvider::new(path))
                .await?
                .monitor_config()
                .clone()
        }
        None => Default::default(),
    };

    if let Some(host) = &opt.host {
        monitor.controller.host = host.clone();
    }
    if let Some(username) = &opt.username {
        monitor.controller.username = username.clone();
    }
    if let Some(password) = &opt.password {
        monitor.controller.password = password.clone();
    }
    if let Some(path) = &opt.snapshot {
        monitor.output.snapshot_format = snapshot_format(path);
        monitor.output.snapshot_path = Some(path.clone());
    }

    let container = ServiceContainer::new(ContainerConfig { monitor });
    container.validate()?;
    Ok(container)
}

fn print_summary(report: &CycleReport) {
    println!("Poll cycle summary");
    println!("==================");
    for mapper in &report.mappers {
        let status = match &mapper.outcome {
            MapperOutcome::Completed { published, failed: 0 } => {
                format!("ok ({} points)", published)
            }
            MapperOutcome::Completed { published, failed } => {
                format!("partial ({} points, {} rejected)", published, failed)
            }
            MapperOutcome::Unsupported(reason) => format!("unsupported ({})", reason),
            MapperOutcome::Failed(reason) => format!("failed ({})", reason),
        };
        println!("{:<10} {}", mapper.mapper, status);
    }
    println!();
    println!("Points published:  {}", report.points_published);
    println!("Fields rejected:   {}", report.field_failures);
    println!("Alerts delivered:  {}", report.alerts_dispatched);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::parse();
    init_logging(opt.verbose);

    let container = build_container(&opt).await?;
    let service = container.create_polling_service()?;
    log::info!(
        "Polling {} with mappers: {}",
        container.monitor_config().controller.host,
        service.mapper_names().join(", ")
    );

    if opt.once {
        let report = service.run_cycle().await;
        print_summary(&report);
        return Ok(());
    }

    let scheduler = container.create_scheduler()?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };
    scheduler.run(service.as_ref(), shutdown).await;

    Ok(())
}
