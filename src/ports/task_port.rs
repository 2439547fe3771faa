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

//! # Task State Port
//!
//! The orchestrator publishes what a job is doing through this contract.
//! Whoever implements it owns the job's externally visible state; the
//! engine only pushes events into it.

use crate::domain::entities::{TaskFailure, TaskProgress};

pub trait TaskStateReporter: Send + Sync {
    /// Fire-and-forget. Implementations must never block the pipeline or panic.
    fn report_progress(&self, progress: TaskProgress);

    /// Terminal. Called exactly once per failed job, right before the error
    /// is handed back to the job queue.
    fn report_failure(&self, failure: TaskFailure);
}
