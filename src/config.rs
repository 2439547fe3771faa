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

//! Application configuration: a YAML/JSON file merged with CLI overrides.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! usable configuration for the stock container layout.

use crate::domain::entities::{ExportRequest, TableFilter};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::firebird::firebird_adapter::charset_for;
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: Option<String>,
    pub charset: String,
    pub host: String,
    pub port: u16,
    /// Command run before every connection attempt to make sure the server is up.
    pub server_start_command: Vec<String>,
    pub max_connect_attempts: u32,
    pub settle_delay_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "SYSDBA".to_string(),
            password: None,
            charset: "ISO8859_1".to_string(),
            host: "localhost".to_string(),
            port: 3050,
            server_start_command: vec!["/etc/init.d/firebird".to_string(), "start".to_string()],
            max_connect_attempts: 20,
            settle_delay_secs: 5,
        }
    }
}

impl DatabaseConfig {
    /// Config file first, then `FIREBIRD_PASSWORD`, then the Firebird factory default.
    pub fn resolve_password(&self) -> String {
        self.password
            .clone()
            .or_else(|| std::env::var("FIREBIRD_PASSWORD").ok())
            .unwrap_or_else(|| "masterkey".to_string())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// Root under which every job gets its own working directory.
    pub work_dir: String,
    /// `all` or `;`-separated table names.
    pub tables: String,
    pub no_chunks: bool,
    pub resume_offset: u64,
    pub chunk_size: u64,
    /// Also export `RDB$RELATION_FIELDS` (every column of every table).
    pub include_metadata: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            work_dir: "/data".to_string(),
            tables: "all".to_string(),
            no_chunks: false,
            resume_offset: 0,
            chunk_size: 10_000,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Expected locator prefix, matched case-sensitively.
    pub scheme: String,
    pub gcloud_bin: String,
    /// Service account key handed to gcloud for every call.
    pub credentials_file: Option<String>,
    /// Highest `-exportN` suffix tried before giving up on a free name.
    pub max_name_suffix: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scheme: "gs://".to_string(),
            gcloud_bin: "gcloud".to_string(),
            credentials_file: None,
            max_name_suffix: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct WorkerConfig {
    /// Fixed number of worker threads. Wins over `cpu_percent`.
    pub workers: Option<usize>,
    pub cpu_percent: Option<u8>,
}

impl WorkerConfig {
    /// Number of worker threads to start (at least 1).
    pub fn resolve_workers(&self) -> usize {
        let n = self.workers.unwrap_or_else(|| {
            let pct = self.cpu_percent.unwrap_or(25).min(100);
            (num_cpus::get() as f64 * (pct as f64 / 100.0)).ceil() as usize
        });
        std::cmp::max(1, n)
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Source backup locator, e.g. gs://bucket/path/BACKUP.GDB (repeatable)
    #[arg(short, long = "source", required = true)]
    pub sources: Vec<String>,

    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub charset: Option<String>,
    /// `all` or `;`-separated table names
    #[arg(long)]
    pub tables: Option<String>,
    /// Read every table in a single query
    #[arg(long)]
    pub no_chunks: bool,
    /// Resume the first table from this row offset
    #[arg(long)]
    pub resume_offset: Option<u64>,
    #[arg(short, long)]
    pub work_dir: Option<String>,
    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub credentials: Option<String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.user { self.database.user = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(c) = &args.charset { self.database.charset = c.clone(); }
        if let Some(t) = &args.tables { self.export.tables = t.clone(); }
        if args.no_chunks { self.export.no_chunks = true; }
        if let Some(o) = args.resume_offset { self.export.resume_offset = o; }
        if let Some(w) = &args.work_dir { self.export.work_dir = w.clone(); }
        if let Some(w) = args.workers { self.worker.workers = Some(w); }
        if let Some(c) = &args.credentials { self.storage.credentials_file = Some(c.clone()); }
    }

    pub fn validate(&self) -> Result<()> {
        if self.export.chunk_size == 0 {
            return Err(ExportError::ConfigError("export.chunk_size must be at least 1".into()));
        }
        if self.database.max_connect_attempts == 0 {
            return Err(ExportError::ConfigError(
                "database.max_connect_attempts must be at least 1".into(),
            ));
        }
        if !self.storage.scheme.ends_with("://") {
            return Err(ExportError::ConfigError(format!(
                "storage.scheme '{}' must end with '://'",
                self.storage.scheme
            )));
        }
        if self.export.work_dir.trim().is_empty() {
            return Err(ExportError::ConfigError("export.work_dir is empty".into()));
        }
        if charset_for(&self.database.charset).is_none() {
            return Err(ExportError::ConfigError(format!(
                "database.charset '{}' is not supported",
                self.database.charset
            )));
        }
        if self.worker.workers == Some(0) {
            return Err(ExportError::ConfigError("worker.workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.export.work_dir)
    }

    /// Builds the request a worker runs for a submitted locator.
    pub fn request_for(&self, source_locator: &str) -> ExportRequest {
        ExportRequest {
            source_locator: source_locator.to_string(),
            user: self.database.user.clone(),
            password: self.database.resolve_password(),
            charset: self.database.charset.clone(),
            table_filter: TableFilter::parse(&self.export.tables),
            chunking_enabled: !self.export.no_chunks,
            resume_offset: self.export.resume_offset,
        }
    }
}
