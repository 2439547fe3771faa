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

//! Uploads an archive next to its source without overwriting anything.
//!
//! Candidate names are `base.ext`, `base-export1.ext`, `base-export2.ext`, ...
//! The first one that does not exist yet wins. The search stops after
//! `max_suffix` collisions.

use crate::domain::errors::{ExportError, Result};
use crate::ports::storage_port::ObjectStore;
use log::{info, warn};
use std::path::Path;

pub fn candidate_key(base_key: &str, ext: &str, suffix: u32) -> String {
    if suffix == 0 {
        format!("{}.{}", base_key, ext)
    } else {
        format!("{}-export{}.{}", base_key, suffix, ext)
    }
}

/// Returns the URI the archive was uploaded to.
pub fn upload_without_overwrite(
    store: &dyn ObjectStore,
    local: &Path,
    bucket: &str,
    base_key: &str,
    ext: &str,
    max_suffix: u32,
) -> Result<String> {
    for suffix in 0..=max_suffix {
        let key = candidate_key(base_key, ext, suffix);
        if store.exists(bucket, &key)? {
            warn!("'{}/{}' exists! Retrying with suffix change", bucket, key);
            continue;
        }
        let uri = store.upload(local, bucket, &key)?;
        info!("File '{}' uploaded to '{}'", local.display(), uri);
        return Ok(uri);
    }

    Err(ExportError::UploadCollisionExhausted {
        base: format!("{}/{}", bucket, base_key),
        attempts: max_suffix + 1,
    })
}
