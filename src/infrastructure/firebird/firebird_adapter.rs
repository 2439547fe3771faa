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

//! Infrastructure adapter for reading Firebird backups with `rsfbclient`.
//!
//! Connections use the pure-Rust wire client against the local server, so
//! no `fbclient` shared library has to be installed next to the exporter.
//! Every cell is rendered to text here (Base64 for BLOBs), which keeps the
//! application layer free of driver types. DATE, TIME and scaled NUMERIC
//! columns already arrive as text, cast by the select list.

use crate::config::DatabaseConfig;
use crate::domain::entities::TableDescriptor;
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::firebird::sql_utils::{
    count_query, page_query, select_all_query, select_list, ColumnSpec, SQL_GET_COLUMNS,
    SQL_LIST_TABLES,
};
use crate::ports::source_port::{ConnectParams, DatabaseConnector, SourceDatabase, TextRow};
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info, warn};
use rsfbclient::charset::{self, Charset};
use rsfbclient::prelude::*;
use rsfbclient::{FbError, Row, SimpleConnection, SqlType};
use std::collections::HashMap;
use std::process::Command;
use std::time::Instant;

/// Maps a Firebird charset name (as users write it) to the driver charset.
pub fn charset_for(name: &str) -> Option<Charset> {
    match name.to_uppercase().replace('-', "_").as_str() {
        "UTF8" | "UTF_8" => Some(charset::UTF_8),
        "ISO8859_1" | "ISO_8859_1" | "LATIN1" => Some(charset::ISO_8859_1),
        "WIN1252" | "WIN_1252" => Some(charset::WIN_1252),
        _ => None,
    }
}

/// An `Io` error means nobody answered on the port yet; everything else is
/// a server-side refusal.
fn classify_connect_error(e: FbError) -> ExportError {
    match e {
        FbError::Io(io) => ExportError::DatabaseUnavailable(io.to_string()),
        other => ExportError::FirebirdError(other.to_string()),
    }
}

/// Renders one driver value the way it lands in the CSV.
pub fn render_cell(value: SqlType) -> String {
    match value {
        SqlType::Null => String::new(),
        SqlType::Text(s) => s,
        SqlType::Integer(i) => i.to_string(),
        SqlType::Floating(f) => f.to_string(),
        SqlType::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        SqlType::Boolean(b) => b.to_string(),
        SqlType::Binary(bytes) => general_purpose::STANDARD.encode(bytes),
    }
}

fn render_row(row: Row) -> TextRow {
    row.cols.into_iter().map(|c| render_cell(c.value)).collect()
}

/// Opens connections on the local Firebird server.
pub struct FirebirdConnector {
    host: String,
    port: u16,
    start_command: Vec<String>,
}

impl FirebirdConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            start_command: config.server_start_command.clone(),
        }
    }
}

impl DatabaseConnector for FirebirdConnector {
    fn ensure_server_running(&self) {
        let Some((program, args)) = self.start_command.split_first() else {
            return;
        };
        // Starting an already running server is a no-op, so failures are only logged.
        match Command::new(program).args(args).status() {
            Ok(status) if status.success() => debug!("'{}' succeeded", program),
            Ok(status) => debug!("'{}' exited with {}", program, status),
            Err(e) => debug!("Could not run '{}': {}", program, e),
        }
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn SourceDatabase>> {
        let charset = charset_for(&params.charset).ok_or_else(|| {
            ExportError::ConfigError(format!("Unsupported charset '{}'", params.charset))
        })?;
        let db_name = params.database_path.to_string_lossy().to_string();

        let conn = rsfbclient::builder_pure_rust()
            .host(&self.host)
            .port(self.port)
            .db_name(&db_name)
            .user(&params.user)
            .pass(&params.password)
            .charset(charset)
            .connect()
            .map_err(classify_connect_error)?;

        info!("Connected to {}:{}/{}", self.host, self.port, db_name);
        Ok(Box::new(FirebirdDatabase {
            conn: SimpleConnection::from(conn),
            columns: HashMap::new(),
        }))
    }
}

/// One open attachment to a backup file. Closed on drop.
pub struct FirebirdDatabase {
    conn: SimpleConnection,
    /// Catalog description per table, read once per connection.
    columns: HashMap<String, Vec<ColumnSpec>>,
}

impl FirebirdDatabase {
    fn column_specs(&mut self, table: &str) -> Result<Vec<ColumnSpec>> {
        if let Some(specs) = self.columns.get(table) {
            return Ok(specs.clone());
        }
        let rows: Vec<(String, i64, i64)> = self
            .conn
            .query(SQL_GET_COLUMNS, (table.to_string(),))
            .map_err(|e| ExportError::query(table, e))?;
        if rows.is_empty() {
            warn!("No columns found for table {}", table);
        }
        let specs: Vec<ColumnSpec> = rows
            .into_iter()
            .map(|(name, field_type, scale)| ColumnSpec {
                name: name.trim().to_string(),
                field_type,
                scale,
            })
            .collect();
        self.columns.insert(table.to_string(), specs.clone());
        Ok(specs)
    }

    fn run_rows(&mut self, table: &str, sql: &str) -> Result<Vec<TextRow>> {
        debug!("Running query: {}", sql);
        let start = Instant::now();
        let rows: Vec<Row> = self
            .conn
            .query(sql, ())
            .map_err(|e| ExportError::query(table, e))?;
        debug!("Took {:.1}s", start.elapsed().as_secs_f64());
        Ok(rows.into_iter().map(render_row).collect())
    }
}

impl SourceDatabase for FirebirdDatabase {
    fn list_tables(&mut self) -> Result<Vec<TableDescriptor>> {
        let rows: Vec<(String,)> = self
            .conn
            .query(SQL_LIST_TABLES, ())
            .map_err(|e| ExportError::query("RDB$RELATIONS", e))?;
        Ok(rows
            .into_iter()
            .map(|(name,)| TableDescriptor::new(name.trim()))
            .collect())
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .column_specs(table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    fn count_rows(&mut self, table: &str) -> Result<u64> {
        let rows: Vec<(i64,)> = self
            .conn
            .query(&count_query(table), ())
            .map_err(|e| ExportError::query(table, e))?;
        let count = rows.first().map(|(n,)| *n).unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    fn fetch_page(&mut self, table: &str, first: u64, skip: u64) -> Result<Vec<TextRow>> {
        let select = select_list(&self.column_specs(table)?);
        self.run_rows(table, &page_query(table, &select, first, skip))
    }

    fn fetch_all(&mut self, table: &str) -> Result<Vec<TextRow>> {
        let select = select_list(&self.column_specs(table)?);
        self.run_rows(table, &select_all_query(table, &select))
    }
}
