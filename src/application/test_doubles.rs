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

//! Hand-written fakes for the ports, shared by the unit tests.

use crate::domain::entities::{TableDescriptor, TaskFailure, TaskProgress};
use crate::domain::errors::{ExportError, Result};
use crate::domain::locator::SourceLocator;
use crate::ports::source_port::{ConnectParams, DatabaseConnector, SourceDatabase, TextRow};
use crate::ports::storage_port::ObjectStore;
use crate::ports::task_port::TaskStateReporter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DbState {
    tables: BTreeMap<String, (Vec<String>, Vec<TextRow>)>,
    page_requests: Vec<(String, u64, u64)>,
    full_reads: Vec<String>,
    count_calls: Vec<String>,
    fail_count: bool,
    fail_page: Option<(String, u64)>,
}

/// In-memory tables. Clones share state, so a test can keep a handle while
/// the code under test owns a boxed copy.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<DbState>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, columns: &[&str], rows: Vec<TextRow>) -> Self {
        self.state.lock().unwrap().tables.insert(
            name.to_string(),
            (columns.iter().map(|c| c.to_string()).collect(), rows),
        );
        self
    }

    /// Table with columns `ID, NAME` and rows `(i, name-i)` for `i in 0..n`.
    pub fn with_numbered_table(self, name: &str, n: usize) -> Self {
        self.with_table(name, &["ID", "NAME"], numbered_rows(n))
    }

    pub fn failing_count(self) -> Self {
        self.state.lock().unwrap().fail_count = true;
        self
    }

    pub fn failing_page(self, table: &str, skip: u64) -> Self {
        self.state.lock().unwrap().fail_page = Some((table.to_string(), skip));
        self
    }

    /// `(first, skip)` of every page read issued against `table`.
    pub fn page_requests(&self, table: &str) -> Vec<(u64, u64)> {
        self.state
            .lock()
            .unwrap()
            .page_requests
            .iter()
            .filter(|(t, _, _)| t == table)
            .map(|(_, first, skip)| (*first, *skip))
            .collect()
    }

    pub fn full_reads(&self) -> Vec<String> {
        self.state.lock().unwrap().full_reads.clone()
    }

    pub fn count_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().count_calls.clone()
    }

    fn table(&self, table: &str) -> Result<(Vec<String>, Vec<TextRow>)> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| ExportError::query(table, "Table unknown"))
    }
}

pub fn numbered_rows(n: usize) -> Vec<TextRow> {
    (0..n).map(|i| vec![i.to_string(), format!("name-{}", i)]).collect()
}

impl SourceDatabase for InMemoryDatabase {
    fn list_tables(&mut self) -> Result<Vec<TableDescriptor>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tables
            .keys()
            .filter(|name| !name.starts_with("RDB$"))
            .map(|name| TableDescriptor::new(name.as_str()))
            .collect())
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.0)
    }

    fn count_rows(&mut self, table: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.count_calls.push(table.to_string());
        if state.fail_count {
            return Err(ExportError::query(table, "count not permitted"));
        }
        state
            .tables
            .get(table)
            .map(|(_, rows)| rows.len() as u64)
            .ok_or_else(|| ExportError::query(table, "Table unknown"))
    }

    fn fetch_page(&mut self, table: &str, first: u64, skip: u64) -> Result<Vec<TextRow>> {
        {
            let mut state = self.state.lock().unwrap();
            state.page_requests.push((table.to_string(), first, skip));
            if state.fail_page.as_ref() == Some(&(table.to_string(), skip)) {
                return Err(ExportError::query(table, "connection lost"));
            }
        }
        let (_, rows) = self.table(table)?;
        let start = (skip as usize).min(rows.len());
        let end = (start + first as usize).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    fn fetch_all(&mut self, table: &str) -> Result<Vec<TextRow>> {
        self.state.lock().unwrap().full_reads.push(table.to_string());
        Ok(self.table(table)?.1)
    }
}

/// Fails the first `failures` connection attempts, then hands out the database.
pub struct FlakyConnector {
    failures: u32,
    hard_failures: bool,
    db: InMemoryDatabase,
    connect_calls: AtomicU32,
    start_calls: AtomicU32,
}

impl FlakyConnector {
    pub fn new(failures: u32, db: InMemoryDatabase) -> Self {
        Self {
            failures,
            hard_failures: false,
            db,
            connect_calls: AtomicU32::new(0),
            start_calls: AtomicU32::new(0),
        }
    }

    /// Fail with a non-transient error instead of "unavailable".
    pub fn with_hard_failures(mut self) -> Self {
        self.hard_failures = true;
        self
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }
}

impl DatabaseConnector for FlakyConnector {
    fn ensure_server_running(&self) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn connect(&self, _params: &ConnectParams) -> Result<Box<dyn SourceDatabase>> {
        let n = self.connect_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err(if self.hard_failures {
                ExportError::FirebirdError("Your user name and password are not defined".into())
            } else {
                ExportError::DatabaseUnavailable("Connection refused".into())
            });
        }
        Ok(Box::new(self.db.clone()))
    }
}

/// Bucket contents keyed by `bucket/object_key`.
pub struct InMemoryStore {
    source_bytes: Vec<u8>,
    write_source: bool,
    fail_upload: bool,
    existing: Mutex<BTreeSet<String>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    probes: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            source_bytes: b"GDB".to_vec(),
            write_source: true,
            fail_upload: false,
            existing: Mutex::new(BTreeSet::new()),
            uploads: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_existing(self, bucket: &str, key: &str) -> Self {
        self.existing.lock().unwrap().insert(format!("{}/{}", bucket, key));
        self
    }

    /// Download "succeeds" without producing a file.
    pub fn without_source_file(mut self) -> Self {
        self.write_source = false;
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    /// `bucket/key` of every upload, in order, with the uploaded bytes.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl ObjectStore for InMemoryStore {
    fn download(&self, _locator: &SourceLocator, dest: &Path) -> Result<PathBuf> {
        if self.write_source {
            std::fs::write(dest, &self.source_bytes)?;
        }
        Ok(dest.to_path_buf())
    }

    fn exists(&self, bucket: &str, object_key: &str) -> Result<bool> {
        let key = format!("{}/{}", bucket, object_key);
        self.probes.lock().unwrap().push(key.clone());
        Ok(self.existing.lock().unwrap().contains(&key))
    }

    fn upload(&self, local: &Path, bucket: &str, object_key: &str) -> Result<String> {
        if self.fail_upload {
            return Err(ExportError::StorageError("403 Forbidden".into()));
        }
        let key = format!("{}/{}", bucket, object_key);
        let bytes = std::fs::read(local)?;
        self.existing.lock().unwrap().insert(key.clone());
        self.uploads.lock().unwrap().push((key, bytes));
        Ok(format!("proto://{}/{}", bucket, object_key))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reported {
    Progress(TaskProgress),
    Failure(TaskFailure),
}

/// Records every event in call order.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Reported>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Reported> {
        self.events.lock().unwrap().clone()
    }

    pub fn stage_indexes(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Reported::Progress(p) => Some(p.stage_index),
                Reported::Failure(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Reported::Failure(f) => Some(f),
                Reported::Progress(_) => None,
            })
            .collect()
    }
}

impl TaskStateReporter for RecordingReporter {
    fn report_progress(&self, progress: TaskProgress) {
        self.events.lock().unwrap().push(Reported::Progress(progress));
    }

    fn report_failure(&self, failure: TaskFailure) {
        self.events.lock().unwrap().push(Reported::Failure(failure));
    }
}
