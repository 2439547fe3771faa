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

//! # Domain Entities
//!
//! Entities are the "Nouns" of the exporter: the tables we find in a backup,
//! the request that describes one job, the pages of rows we move, and the
//! progress/failure records we publish about a job.
//!
//! We use the `serde` crate (Serialize/Deserialize) for the values that leave
//! the process (task statuses, reports).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of pipeline stages reported for every job.
pub const STAGE_TOTAL: u32 = 5;

/// A user table discovered in the Firebird catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Which tables the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFilter {
    /// Every user table, in catalog order.
    All,
    /// Only the named tables (order is irrelevant, catalog order wins).
    Named(Vec<String>),
}

impl TableFilter {
    /// Parses `all` (any case) or a `;`-separated list of table names.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("all") {
            return TableFilter::All;
        }
        let names = raw
            .split(';')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        TableFilter::Named(names)
    }
}

impl fmt::Display for TableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableFilter::All => write!(f, "all"),
            TableFilter::Named(names) => write!(f, "{}", names.join(";")),
        }
    }
}

/// `ExportRequest` is everything a worker needs to run one job.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// e.g. `gs://bucket/path/to/BACKUP.GDB`
    pub source_locator: String,
    pub user: String,
    pub password: String,
    /// Firebird connection charset (`WIN1252`, `ISO8859_1`, `UTF8`, ...).
    pub charset: String,
    pub table_filter: TableFilter,
    pub chunking_enabled: bool,
    /// Row offset to resume the first table from. Ignored for every other
    /// table and when chunking is disabled.
    pub resume_offset: u64,
}

/// One page of rows read from a table.
#[derive(Debug, Clone)]
pub struct ExportChunk {
    pub table_name: String,
    pub offset_start: u64,
    pub row_count: usize,
    pub columns: Vec<String>,
    /// Every cell is already rendered as text.
    pub rows: Vec<Vec<String>>,
}

impl ExportChunk {
    /// A page shorter than what we asked for is the last one for its table.
    pub fn is_terminal(&self, requested: u64) -> bool {
        self.row_count == 0 || (self.row_count as u64) < requested
    }
}

/// What we know about one exported table once it is on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableExportStats {
    pub rows: u64,
    pub pages: u64,
}

/// A progress event: "stage N of 5, doing X".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub stage_index: u32,
    pub stage_total: u32,
    pub status_message: String,
}

/// Terminal failure details published for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub exception_kind: String,
    pub diagnostic_lines: Vec<String>,
}

impl From<&crate::domain::errors::ExportError> for TaskFailure {
    fn from(e: &crate::domain::errors::ExportError) -> Self {
        Self {
            exception_kind: e.kind().to_string(),
            diagnostic_lines: e.diagnostic_lines(),
        }
    }
}

/// Terminal success value of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub output_uri: String,
}

/// What a caller sees when polling a job by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Progress {
        current: u32,
        total: u32,
        status: String,
    },
    Success {
        output_uri: String,
    },
    Failure {
        exc_type: String,
        exc_message: Vec<String>,
    },
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success { .. } | TaskStatus::Failure { .. })
    }
}

/// Lifecycle of one job inside the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Downloading,
    Exporting,
    Archiving,
    Uploading,
    CleaningUp,
    Succeeded,
    Failed,
}

impl JobState {
    /// 1-based stage index for the five reported stages.
    pub fn stage_index(self) -> Option<u32> {
        match self {
            JobState::Downloading => Some(1),
            JobState::Exporting => Some(2),
            JobState::Archiving => Some(3),
            JobState::Uploading => Some(4),
            JobState::CleaningUp => Some(5),
            JobState::Pending | JobState::Succeeded | JobState::Failed => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "PENDING",
            JobState::Downloading => "DOWNLOADING",
            JobState::Exporting => "EXPORTING",
            JobState::Archiving => "ARCHIVING",
            JobState::Uploading => "UPLOADING",
            JobState::CleaningUp => "CLEANING_UP",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}
