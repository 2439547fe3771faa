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

//! Core error definitions for the GDB exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application to handle Firebird, storage, I/O and
//! job-level errors.

use thiserror::Error;

/// Error types encountered while running an export job.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Malformed source locator '{locator}': {reason}")]
    MalformedLocator { locator: String, reason: String },

    /// A single connection attempt failed because the server was not reachable yet.
    #[error("Firebird unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Firebird error: {0}")]
    FirebirdError(String),

    #[error("Could not connect to Firebird after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    #[error("Query failed for {table}: {reason}")]
    QueryError { table: String, reason: String },

    #[error("Source file '{0}' is not a file")]
    SourceNotFound(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("No free object name for '{base}' after {attempts} attempts")]
    UploadCollisionExhausted { base: String, attempts: u32 },

    #[error("Worker pool is halted and no longer accepts jobs")]
    WorkerHalted,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::ArchiveError(e.to_string())
    }
}

impl ExportError {
    /// Wraps any read/write failure that happened while exporting `table`.
    pub fn query(table: &str, reason: impl std::fmt::Display) -> Self {
        ExportError::QueryError {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The exception kind published with a task failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::ConfigError(_) => "ConfigurationFailure",
            ExportError::MalformedLocator { .. } => "MalformedInputFailure",
            ExportError::DatabaseUnavailable(_)
            | ExportError::FirebirdError(_)
            | ExportError::ConnectionExhausted { .. } => "ConnectionFailure",
            ExportError::QueryError { .. } => "QueryFailure",
            ExportError::SourceNotFound(_) => "SourceNotFound",
            ExportError::ArchiveError(_) => "ArchiveFailure",
            ExportError::StorageError(_) => "StorageFailure",
            ExportError::UploadCollisionExhausted { .. } => "UploadCollisionExhaustion",
            ExportError::WorkerHalted => "WorkerHalted",
            ExportError::IoError(_) => "IoFailure",
        }
    }

    /// Errors that make the shared Firebird server unusable for every job.
    pub fn is_service_fatal(&self) -> bool {
        matches!(self, ExportError::ConnectionExhausted { .. })
    }

    /// Flattens the error and its `source()` chain into one line per cause.
    pub fn diagnostic_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.kind(), self)];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            lines.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        lines
    }
}

/// A specialized Result type for the GDB exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
