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

//! Table discovery and filtering.

use crate::domain::entities::{TableDescriptor, TableFilter};
use crate::domain::errors::Result;
use crate::ports::source_port::SourceDatabase;
use log::info;

/// User tables present in the backup, ordered by name.
pub fn list_tables(db: &mut dyn SourceDatabase) -> Result<Vec<TableDescriptor>> {
    let tables = db.list_tables()?;
    info!(
        "Found {} table(s): {}",
        tables.len(),
        tables.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(tables)
}

/// Keeps the requested tables that actually exist, in catalog order.
/// Requested names with no matching table are dropped without error.
pub fn resolve(filter: &TableFilter, available: &[TableDescriptor]) -> Vec<TableDescriptor> {
    let selected: Vec<TableDescriptor> = match filter {
        TableFilter::All => available.to_vec(),
        TableFilter::Named(wanted) => available
            .iter()
            .filter(|t| wanted.iter().any(|w| w == &t.name))
            .cloned()
            .collect(),
    };

    let requested = match filter {
        TableFilter::All => available.len(),
        TableFilter::Named(wanted) => wanted.len(),
    };
    info!(
        "Found {} requested tables (out of {} requested, {} total)",
        selected.len(),
        requested,
        available.len()
    );
    selected
}
