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

//! Parsing of `scheme://bucket/path/.../FILE.EXT` source locators.
//!
//! Decomposition is purely syntactic: the bucket ends at the first `/`,
//! the file name starts after the last `/`, and the base name drops
//! everything from the last `.` of the file name.

use crate::domain::errors::{ExportError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    pub scheme: String,
    pub bucket: String,
    /// Directory part inside the bucket, without leading/trailing `/`.
    pub object_path: String,
    pub file_name: String,
}

impl SourceLocator {
    pub fn parse(raw: &str, scheme: &str) -> Result<Self> {
        let malformed = |reason: &str| ExportError::MalformedLocator {
            locator: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = raw
            .strip_prefix(scheme)
            .ok_or_else(|| malformed(&format!("expected '{}' prefix", scheme)))?;

        let (full_path, file_name) = rest
            .rsplit_once('/')
            .ok_or_else(|| malformed("missing object path"))?;
        let (bucket, object_path) = full_path
            .split_once('/')
            .ok_or_else(|| malformed("missing directory inside bucket"))?;

        if bucket.is_empty() {
            return Err(malformed("empty bucket name"));
        }
        if object_path.is_empty() {
            return Err(malformed("empty object path"));
        }
        if file_name.is_empty() {
            return Err(malformed("empty file name"));
        }
        if matches!(file_name.rsplit_once('.'), Some(("", _))) {
            return Err(malformed("empty base name"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            object_path: object_path.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// `VERY.IMPORTANT.BACKUP.GDB` => `VERY.IMPORTANT.BACKUP`
    pub fn base_name(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((base, _)) => base,
            None => &self.file_name,
        }
    }

    /// Object key of the source file inside its bucket.
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.object_path, self.file_name)
    }

    /// Object key (without extension) the export archive is named after.
    pub fn export_base_key(&self) -> String {
        format!("{}/{}", self.object_path, self.base_name())
    }

    pub fn uri(&self) -> String {
        format!("{}{}/{}", self.scheme, self.bucket, self.object_key())
    }
}
