//! # GDB Datalake Exporter
//!
//! Turns Firebird `.GDB` backups stored in a cloud bucket into zipped CSV
//! exports uploaded next to the source file.
//!
//! This application follows the **Hexagonal Architecture** (Ports and Adapters)
//! to maintain a strict separation between business logic and infrastructure.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::orchestrator::{ExportOrchestrator, OrchestratorSettings};
use crate::application::worker::WorkerPool;
use crate::config::{AppConfig, CliArgs};
use crate::domain::entities::TaskStatus;
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::firebird::connection_supervisor::ConnectionSupervisor;
use crate::infrastructure::firebird::firebird_adapter::FirebirdConnector;
use crate::infrastructure::gcp::storage::GcloudStorage;
use clap::Parser;
use log::{error, info, warn};
use serde_json::json;
use std::process;
use std::sync::Arc;
use std::time::Instant;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match &args.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let connector = Arc::new(FirebirdConnector::new(&config.database));
    let supervisor = ConnectionSupervisor::from_config(connector, &config.database);
    let store = Arc::new(GcloudStorage::new(&config.storage));
    let orchestrator = Arc::new(ExportOrchestrator::new(
        supervisor,
        store,
        OrchestratorSettings::from_config(&config),
    ));

    // 5. Run the jobs
    let start = Instant::now();
    let workers = config.worker.resolve_workers();
    let mut pool = WorkerPool::start(orchestrator, config.clone(), workers);

    let mut submitted = Vec::new();
    for source in &args.sources {
        match pool.submit(source) {
            Ok(id) => submitted.push((source.clone(), Some(id))),
            Err(e) => {
                warn!("Could not submit '{}': {}", source, e);
                submitted.push((source.clone(), None));
            }
        }
    }
    pool.shutdown();

    // 6. Summarize
    let details: Vec<_> = submitted
        .iter()
        .map(|(source, id)| {
            let status = id.as_ref().and_then(|id| pool.status(id));
            (source.as_str(), id.as_deref(), status)
        })
        .collect();
    let success = details
        .iter()
        .filter(|(_, _, s)| matches!(s, Some(TaskStatus::Success { .. })))
        .count();
    info!("Export finished. {}/{} jobs successful.", success, details.len());
    if pool.is_halted() {
        error!("Worker pool was halted because Firebird could not be reached");
    }

    if let Err(e) = write_report(&config, &details, start.elapsed().as_secs_f64()) {
        error!("Failed to write report: {}", e);
    }

    if success != details.len() {
        process::exit(1);
    }
}

fn write_report(
    config: &AppConfig,
    details: &[(&str, Option<&str>, Option<TaskStatus>)],
    duration_secs: f64,
) -> Result<()> {
    let success = details
        .iter()
        .filter(|(_, _, s)| matches!(s, Some(TaskStatus::Success { .. })))
        .count();

    let report = json!({
        "summary": {
            "total_jobs": details.len(),
            "success": success,
            "failed": details.len() - success,
            "total_duration_seconds": duration_secs,
        },
        "details": details
            .iter()
            .map(|(source, id, status)| json!({
                "source": source,
                "job_id": id,
                "status": status,
            }))
            .collect::<Vec<_>>(),
    });

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let work_dir = config.work_dir();
    std::fs::create_dir_all(&work_dir)?;
    let report_path = work_dir.join(format!("report_{}.json", timestamp));

    let file = std::fs::File::create(&report_path)?;
    serde_json::to_writer_pretty(file, &report)
        .map_err(|e| ExportError::IoError(e.into()))?;
    info!("Report written to '{}'", report_path.display());
    Ok(())
}
