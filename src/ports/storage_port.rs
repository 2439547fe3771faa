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

//! Port for the object storage bucket the backups come from and the
//! archives go back to.

use crate::domain::errors::Result;
use crate::domain::locator::SourceLocator;
use std::path::{Path, PathBuf};

pub trait ObjectStore: Send + Sync {
    /// Downloads the object behind `locator` to `dest` and returns the local path.
    fn download(&self, locator: &SourceLocator, dest: &Path) -> Result<PathBuf>;

    fn exists(&self, bucket: &str, object_key: &str) -> Result<bool>;

    /// Uploads `local` as `object_key` and returns the resulting URI.
    fn upload(&self, local: &Path, bucket: &str, object_key: &str) -> Result<String>;
}
