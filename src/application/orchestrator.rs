// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The core application logic that runs one export job end to end.
//!
//! A job moves through five reported stages:
//!
//! 1. download the backup into the job's working directory,
//! 2. export the selected tables to CSV,
//! 3. zip the CSV directory,
//! 4. upload the archive next to the source without overwriting anything,
//! 5. remove every local file the job created.
//!
//! Any error stops the job where it happened. Local files are left in place
//! for inspection and exactly one failure is reported.

use crate::application::catalog;
use crate::application::chunked_exporter::{ChunkedExporter, ExtractionMode};
use crate::application::uploader;
use crate::config::AppConfig;
use crate::domain::entities::{
    ExportOutcome, ExportRequest, JobState, TableDescriptor, TaskFailure, TaskProgress, STAGE_TOTAL,
};
use crate::domain::errors::{ExportError, Result};
use crate::domain::locator::SourceLocator;
use crate::infrastructure::firebird::connection_supervisor::ConnectionSupervisor;
use crate::infrastructure::local_storage::archive::{self, ARCHIVE_EXTENSION};
use crate::ports::source_port::{ConnectParams, SourceDatabase, COLUMN_DICTIONARY};
use crate::ports::storage_port::ObjectStore;
use crate::ports::task_port::TaskStateReporter;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// The subset of the configuration a job needs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub scheme: String,
    pub work_dir: PathBuf,
    pub chunk_size: u64,
    pub include_metadata: bool,
    pub max_name_suffix: u32,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scheme: config.storage.scheme.clone(),
            work_dir: config.work_dir(),
            chunk_size: config.export.chunk_size,
            include_metadata: config.export.include_metadata,
            max_name_suffix: config.storage.max_name_suffix,
        }
    }
}

/// Local paths owned by one job: `<work_dir>/<job_id>/`.
#[derive(Debug, Clone)]
struct JobWorkspace {
    root: PathBuf,
    source: PathBuf,
    csv_dir: PathBuf,
    archive: PathBuf,
}

impl JobWorkspace {
    fn new(work_dir: &Path, job_id: &str) -> Self {
        let root = work_dir.join(job_id);
        Self {
            source: root.join(format!("{}.gdb", job_id)),
            csv_dir: root.join("csv"),
            archive: root.join(format!("{}.{}", job_id, ARCHIVE_EXTENSION)),
            root,
        }
    }
}

pub struct ExportOrchestrator {
    supervisor: ConnectionSupervisor,
    store: Arc<dyn ObjectStore>,
    settings: OrchestratorSettings,
}

impl ExportOrchestrator {
    pub fn new(
        supervisor: ConnectionSupervisor,
        store: Arc<dyn ObjectStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            supervisor,
            store,
            settings,
        }
    }

    /// Runs the job. On failure the error is reported through `reporter`
    /// exactly once and then returned.
    pub fn run(
        &self,
        job_id: &str,
        request: &ExportRequest,
        reporter: &dyn TaskStateReporter,
    ) -> Result<ExportOutcome> {
        let start = Instant::now();
        info!("Job {} started for '{}'", job_id, request.source_locator);

        let mut state = JobState::Pending;
        match self.execute(job_id, request, reporter, &mut state) {
            Ok(outcome) => {
                transition(job_id, &mut state, JobState::Succeeded);
                info!(
                    "Job {} finished in {:.1}s: {}",
                    job_id,
                    start.elapsed().as_secs_f64(),
                    outcome.output_uri
                );
                Ok(outcome)
            }
            Err(e) => {
                error!("Job {} failed during {}: {}", job_id, state, e);
                transition(job_id, &mut state, JobState::Failed);
                reporter.report_failure(TaskFailure::from(&e));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        job_id: &str,
        request: &ExportRequest,
        reporter: &dyn TaskStateReporter,
        state: &mut JobState,
    ) -> Result<ExportOutcome> {
        let locator = SourceLocator::parse(&request.source_locator, &self.settings.scheme)?;
        let workspace = JobWorkspace::new(&self.settings.work_dir, job_id);

        enter(job_id, state, JobState::Downloading, reporter, "Downloading GDB backup");
        self.download(&locator, &workspace)?;

        if workspace.csv_dir.exists() {
            std::fs::remove_dir_all(&workspace.csv_dir)?;
        }
        std::fs::create_dir_all(&workspace.csv_dir)?;

        enter(job_id, state, JobState::Exporting, reporter, "Exporting GDB to CSV");
        self.export_tables(request, &workspace)?;

        enter(job_id, state, JobState::Archiving, reporter, "Zipping CSV files");
        archive::zip_directory(&workspace.csv_dir, &workspace.archive)?;

        enter(job_id, state, JobState::Uploading, reporter, "Uploading zip file");
        let output_uri = uploader::upload_without_overwrite(
            self.store.as_ref(),
            &workspace.archive,
            &locator.bucket,
            &locator.export_base_key(),
            ARCHIVE_EXTENSION,
            self.settings.max_name_suffix,
        )?;

        enter(job_id, state, JobState::CleaningUp, reporter, "Cleaning up");
        cleanup(&workspace)?;

        Ok(ExportOutcome { output_uri })
    }

    fn download(&self, locator: &SourceLocator, workspace: &JobWorkspace) -> Result<()> {
        std::fs::create_dir_all(&workspace.root)?;
        let path = self.store.download(locator, &workspace.source)?;
        if !path.is_file() {
            return Err(ExportError::SourceNotFound(path.display().to_string()));
        }
        Ok(())
    }

    /// Holds a single connection for every table of the job.
    fn export_tables(&self, request: &ExportRequest, workspace: &JobWorkspace) -> Result<()> {
        let params = ConnectParams {
            database_path: workspace.source.clone(),
            user: request.user.clone(),
            password: request.password.clone(),
            charset: request.charset.clone(),
        };
        let mut db = self.supervisor.acquire(&params)?;
        let exporter = ChunkedExporter::new(&workspace.csv_dir, self.settings.chunk_size);

        if self.settings.include_metadata {
            let dictionary = TableDescriptor::new(COLUMN_DICTIONARY);
            exporter.export_table(db.as_mut(), &dictionary, ExtractionMode::Full)?;
        }

        let available = catalog::list_tables(db.as_mut())?;
        let tables = catalog::resolve(&request.table_filter, &available);
        if tables.is_empty() {
            warn!("No tables selected by filter '{}'", request.table_filter);
        }

        for (i, table) in tables.iter().enumerate() {
            info!("Exporting table {} ({}/{})", table.name, i + 1, tables.len());
            let mode = if request.chunking_enabled {
                // Resume and row count only ever apply to the first table.
                ExtractionMode::Chunked {
                    resume_offset: if i == 0 { request.resume_offset } else { 0 },
                    count_rows: i == 0,
                }
            } else {
                ExtractionMode::Full
            };
            export_one(&exporter, db.as_mut(), table, mode)?;
        }
        Ok(())
    }
}

fn export_one(
    exporter: &ChunkedExporter,
    db: &mut dyn SourceDatabase,
    table: &TableDescriptor,
    mode: ExtractionMode,
) -> Result<()> {
    let stats = exporter.export_table(db, table, mode)?;
    info!(
        "Table {} done: {} rows in {} page(s)",
        table.name, stats.rows, stats.pages
    );
    Ok(())
}

fn transition(job_id: &str, state: &mut JobState, next: JobState) {
    info!("Job {}: {} -> {}", job_id, state, next);
    *state = next;
}

fn enter(
    job_id: &str,
    state: &mut JobState,
    next: JobState,
    reporter: &dyn TaskStateReporter,
    message: &str,
) {
    transition(job_id, state, next);
    if let Some(stage_index) = next.stage_index() {
        reporter.report_progress(TaskProgress {
            stage_index,
            stage_total: STAGE_TOTAL,
            status_message: message.to_string(),
        });
    }
}

fn cleanup(workspace: &JobWorkspace) -> Result<()> {
    std::fs::remove_dir_all(&workspace.csv_dir)?;
    std::fs::remove_file(&workspace.source)?;
    std::fs::remove_file(&workspace.archive)?;
    std::fs::remove_dir_all(&workspace.root)?;
    Ok(())
}
