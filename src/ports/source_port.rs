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

//! # Source Database Port
//!
//! In Hexagonal Architecture, a **Port** is a contract. This one describes
//! the only reads the exporter ever performs against a backup file: list the
//! tables, describe their columns, count them, and read them whole or one
//! page at a time in a stable order.
//!
//! The application layer never builds SQL itself; the Firebird adapter owns
//! the dialect (`FIRST/SKIP`, `RDB$DB_KEY`, system relations).

use crate::domain::entities::TableDescriptor;
use crate::domain::errors::Result;
use std::path::PathBuf;

/// System relation describing every column of every table. Exported whole
/// alongside the user tables.
pub const COLUMN_DICTIONARY: &str = "RDB$RELATION_FIELDS";

/// A row already rendered as text cells, in column order.
pub type TextRow = Vec<String>;

/// Everything needed to open a connection to one backup file.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub database_path: PathBuf,
    pub user: String,
    pub password: String,
    pub charset: String,
}

/// An open connection to the embedded server.
///
/// Methods take `&mut self` because a Firebird attachment runs one statement
/// at a time. Dropping the value closes the connection.
pub trait SourceDatabase {
    /// User tables (no system relations, no views), ordered by name.
    fn list_tables(&mut self) -> Result<Vec<TableDescriptor>>;

    /// Column names of `table` in field-position order.
    fn table_columns(&mut self, table: &str) -> Result<Vec<String>>;

    fn count_rows(&mut self, table: &str) -> Result<u64>;

    /// Reads at most `first` rows after skipping `skip`, ordered by the
    /// physical record key so consecutive pages never overlap.
    fn fetch_page(&mut self, table: &str, first: u64, skip: u64) -> Result<Vec<TextRow>>;

    /// Reads the whole table in one statement.
    fn fetch_all(&mut self, table: &str) -> Result<Vec<TextRow>>;
}

/// Knows how to reach the embedded server and open connections on it.
pub trait DatabaseConnector: Send + Sync {
    /// Best-effort "make sure the server process is up". Must not fail.
    fn ensure_server_running(&self);

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn SourceDatabase>>;
}
