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

//! # Task Tracker
//!
//! Records the externally visible state of every job so callers can poll it
//! by id. The orchestrator writes through a per-job [`JobReporter`].
//!
//! Rules enforced here:
//! - `Success` and `Failure` are terminal; later events are dropped.
//! - Progress never moves backwards to a lower stage.
//! - A poisoned lock is logged and the event dropped; reporting never panics.

use crate::domain::entities::{TaskFailure, TaskProgress, TaskStatus};
use crate::ports::task_port::TaskStateReporter;
use log::{error, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct TaskTracker {
    statuses: Arc<Mutex<HashMap<String, TaskStatus>>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: &str) {
        self.update(job_id, |_| Some(TaskStatus::Pending));
    }

    pub fn status(&self, job_id: &str) -> Option<TaskStatus> {
        match self.statuses.lock() {
            Ok(map) => map.get(job_id).cloned(),
            Err(e) => {
                error!("Task tracker lock poisoned: {}", e);
                None
            }
        }
    }

    pub fn mark_success(&self, job_id: &str, output_uri: &str) {
        let uri = output_uri.to_string();
        self.update(job_id, move |current| match current {
            Some(s) if s.is_terminal() => {
                warn!("Job {} already finished; ignoring success", job_id);
                None
            }
            _ => Some(TaskStatus::Success { output_uri: uri }),
        });
    }

    pub fn mark_failure(&self, job_id: &str, failure: TaskFailure) {
        self.update(job_id, move |current| match current {
            Some(s) if s.is_terminal() => {
                warn!("Job {} already finished; ignoring failure", job_id);
                None
            }
            _ => Some(TaskStatus::Failure {
                exc_type: failure.exception_kind,
                exc_message: failure.diagnostic_lines,
            }),
        });
    }

    pub fn mark_progress(&self, job_id: &str, progress: TaskProgress) {
        self.update(job_id, move |current| match current {
            Some(s) if s.is_terminal() => {
                warn!("Job {} already finished; ignoring progress", job_id);
                None
            }
            Some(TaskStatus::Progress { current, .. }) if *current > progress.stage_index => {
                warn!(
                    "Job {} progress went backwards ({} -> {}); ignoring",
                    job_id, current, progress.stage_index
                );
                None
            }
            _ => Some(TaskStatus::Progress {
                current: progress.stage_index,
                total: progress.stage_total,
                status: progress.status_message,
            }),
        });
    }

    /// A reporter bound to one job id.
    pub fn reporter_for(&self, job_id: &str) -> JobReporter {
        JobReporter {
            tracker: self.clone(),
            job_id: job_id.to_string(),
        }
    }

    fn update<F>(&self, job_id: &str, next: F)
    where
        F: FnOnce(Option<&TaskStatus>) -> Option<TaskStatus>,
    {
        match self.statuses.lock() {
            Ok(mut map) => {
                if let Some(status) = next(map.get(job_id)) {
                    map.insert(job_id.to_string(), status);
                }
            }
            Err(e) => error!("Task tracker lock poisoned, dropping update for {}: {}", job_id, e),
        }
    }
}

pub struct JobReporter {
    tracker: TaskTracker,
    job_id: String,
}

impl TaskStateReporter for JobReporter {
    fn report_progress(&self, progress: TaskProgress) {
        self.tracker.mark_progress(&self.job_id, progress);
    }

    fn report_failure(&self, failure: TaskFailure) {
        self.tracker.mark_failure(&self.job_id, failure);
    }
}
