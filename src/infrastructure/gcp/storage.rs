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

//! `ObjectStore` backed by the `gcloud storage` CLI.
//!
//! Every call runs with `CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE` pointing at
//! the configured service account key, so the exporter never depends on the
//! ambient `gcloud auth` state of the host.

use crate::config::StorageConfig;
use crate::domain::errors::{ExportError, Result};
use crate::domain::locator::SourceLocator;
use crate::ports::storage_port::ObjectStore;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CREDENTIAL_ENV: &str = "CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE";

pub struct GcloudStorage {
    gcloud_bin: String,
    scheme: String,
    credentials_file: Option<PathBuf>,
}

impl GcloudStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            gcloud_bin: config.gcloud_bin.clone(),
            scheme: config.scheme.clone(),
            credentials_file: config.credentials_file.as_ref().map(PathBuf::from),
        }
    }

    fn uri(&self, bucket: &str, object_key: &str) -> String {
        format!("{}{}/{}", self.scheme, bucket, object_key)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.gcloud_bin);
        cmd.arg("storage").args(args);
        if let Some(creds) = &self.credentials_file {
            cmd.env(CREDENTIAL_ENV, creds);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running {} storage {}", self.gcloud_bin, args.join(" "));
        self.command(args)
            .output()
            .map_err(|e| ExportError::StorageError(format!("Could not run {}: {}", self.gcloud_bin, e)))
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// `gcloud storage ls` exits non-zero for a missing object; only that
/// specific message means "does not exist".
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("matched no objects") || stderr.contains("No URLs matched")
}

impl ObjectStore for GcloudStorage {
    fn download(&self, locator: &SourceLocator, dest: &Path) -> Result<PathBuf> {
        let src = locator.uri();
        let dest_str = dest.to_string_lossy().to_string();
        info!("Downloading '{}' to file '{}'", src, dest_str);

        let output = self.run(&["cp", &src, &dest_str])?;
        if !output.status.success() {
            return Err(ExportError::StorageError(format!(
                "Download failed from {}: {}",
                src,
                stderr_of(&output)
            )));
        }
        Ok(dest.to_path_buf())
    }

    fn exists(&self, bucket: &str, object_key: &str) -> Result<bool> {
        let uri = self.uri(bucket, object_key);
        let output = self.run(&["ls", &uri])?;
        if output.status.success() {
            return Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty());
        }
        let stderr = stderr_of(&output);
        if is_not_found(&stderr) {
            Ok(false)
        } else {
            Err(ExportError::StorageError(format!("Listing failed for {}: {}", uri, stderr)))
        }
    }

    fn upload(&self, local: &Path, bucket: &str, object_key: &str) -> Result<String> {
        let uri = self.uri(bucket, object_key);
        let local_str = local.to_string_lossy().to_string();

        let output = self.run(&["cp", &local_str, &uri])?;
        if !output.status.success() {
            return Err(ExportError::StorageError(format!(
                "Upload to {} failed: {}",
                uri,
                stderr_of(&output)
            )));
        }
        Ok(uri)
    }
}
