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

//! # Worker Pool
//!
//! A fixed set of threads pulling jobs from a `crossbeam-channel` queue.
//! Each job gets a fresh id and is tracked in the shared [`TaskTracker`].
//!
//! When a job fails because the Firebird server could not be reached at all,
//! the pool halts: new submissions are refused and every job still queued is
//! marked failed with `WorkerHalted` instead of being run.

use crate::application::orchestrator::ExportOrchestrator;
use crate::application::task_tracker::TaskTracker;
use crate::config::AppConfig;
use crate::domain::entities::{ExportRequest, TaskFailure, TaskStatus};
use crate::domain::errors::{ExportError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Job {
    id: String,
    request: ExportRequest,
}

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    tracker: TaskTracker,
    halted: Arc<AtomicBool>,
    config: AppConfig,
}

impl WorkerPool {
    pub fn start(orchestrator: Arc<ExportOrchestrator>, config: AppConfig, workers: usize) -> Self {
        let workers = workers.max(1);
        info!("Starting worker pool with {} thread(s)", workers);

        let (tx, rx): (Sender<Job>, Receiver<Job>) = unbounded();
        let tracker = TaskTracker::new();
        let halted = Arc::new(AtomicBool::new(false));

        let handles = (0..workers)
            .map(|i| {
                let rx = rx.clone();
                let orchestrator = orchestrator.clone();
                let tracker = tracker.clone();
                let halted = halted.clone();
                thread::spawn(move || {
                    info!("Worker {} started", i);
                    while let Ok(job) = rx.recv() {
                        run_job(&orchestrator, &tracker, &halted, job);
                    }
                    info!("Worker {} finished", i);
                })
            })
            .collect();

        Self {
            sender: Some(tx),
            handles,
            tracker,
            halted,
            config,
        }
    }

    /// Queues an export of `source_locator` and returns its job id.
    pub fn submit(&self, source_locator: &str) -> Result<String> {
        if self.is_halted() {
            return Err(ExportError::WorkerHalted);
        }
        let sender = self.sender.as_ref().ok_or(ExportError::WorkerHalted)?;

        let id = uuid::Uuid::new_v4().to_string();
        self.tracker.register(&id);
        let job = Job {
            id: id.clone(),
            request: self.config.request_for(source_locator),
        };
        if sender.send(job).is_err() {
            let e = ExportError::WorkerHalted;
            self.tracker.mark_failure(&id, TaskFailure::from(&e));
            return Err(e);
        }
        info!("Queued job {} for '{}'", id, source_locator);
        Ok(id)
    }

    pub fn status(&self, job_id: &str) -> Option<TaskStatus> {
        self.tracker.status(job_id)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Stops accepting work, lets the queue drain and joins every thread.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("A worker thread panicked");
            }
        }
        info!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown();
        }
    }
}

fn run_job(orchestrator: &ExportOrchestrator, tracker: &TaskTracker, halted: &AtomicBool, job: Job) {
    if halted.load(Ordering::SeqCst) {
        warn!("Pool halted; not running job {}", job.id);
        tracker.mark_failure(&job.id, TaskFailure::from(&ExportError::WorkerHalted));
        return;
    }

    let reporter = tracker.reporter_for(&job.id);
    match orchestrator.run(&job.id, &job.request, &reporter) {
        Ok(outcome) => tracker.mark_success(&job.id, &outcome.output_uri),
        Err(e) if e.is_service_fatal() => {
            error!("Firebird server unusable ({}); halting worker pool", e);
            halted.store(true, Ordering::SeqCst);
        }
        // Already reported by the orchestrator.
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::OrchestratorSettings;
    use crate::application::test_doubles::{FlakyConnector, InMemoryDatabase, InMemoryStore};
    use crate::infrastructure::firebird::connection_supervisor::ConnectionSupervisor;
    use std::time::Duration;

    fn pool(connect_failures: u32, work_dir: &std::path::Path) -> WorkerPool {
        let db = InMemoryDatabase::new().with_numbered_table("T", 3);
        let connector = Arc::new(FlakyConnector::new(connect_failures, db));
        let mut config = AppConfig::default();
        config.export.work_dir = work_dir.display().to_string();
        config.export.include_metadata = false;
        config.storage.scheme = "proto://".into();

        let orchestrator = ExportOrchestrator::new(
            ConnectionSupervisor::new(connector, 2, Duration::ZERO),
            Arc::new(InMemoryStore::new()),
            OrchestratorSettings::from_config(&config),
        );
        WorkerPool::start(Arc::new(orchestrator), config, 1)
    }

    #[test]
    fn test_jobs_succeed_and_are_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool(0, dir.path());

        let a = pool.submit("proto://b/dir/A.GDB").unwrap();
        let bad = pool.submit("nope").unwrap();
        pool.shutdown();

        assert_eq!(
            pool.status(&a),
            Some(TaskStatus::Success {
                output_uri: "proto://b/dir/A.zip".into()
            })
        );
        assert!(matches!(
            pool.status(&bad),
            Some(TaskStatus::Failure { ref exc_type, .. }) if exc_type == "MalformedInputFailure"
        ));
        assert!(!pool.is_halted());
    }

    #[test]
    fn test_connection_exhaustion_halts_pool() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool(u32::MAX, dir.path());

        let first = pool.submit("proto://b/dir/A.GDB").unwrap();
        // The first job may already have halted the pool by now.
        let second = pool.submit("proto://b/dir/B.GDB");
        pool.shutdown();

        assert!(pool.is_halted());
        assert!(matches!(
            pool.status(&first),
            Some(TaskStatus::Failure { ref exc_type, .. }) if exc_type == "ConnectionFailure"
        ));
        match second {
            Ok(id) => assert!(matches!(
                pool.status(&id),
                Some(TaskStatus::Failure { ref exc_type, .. }) if exc_type == "WorkerHalted"
            )),
            Err(e) => assert!(matches!(e, ExportError::WorkerHalted)),
        }
        assert!(matches!(
            pool.submit("proto://b/dir/C.GDB"),
            Err(ExportError::WorkerHalted)
        ));
    }
}
