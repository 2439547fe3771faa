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

//! Packs a job's output directory into a single deflated zip.

use crate::domain::errors::Result;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "zip";

/// Zips every file under `src_dir` (paths relative to it, sorted) into `dest`.
pub fn zip_directory(src_dir: &Path, dest: &Path) -> Result<PathBuf> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let mut count = 0usize;
    add_dir_recursively(&mut zip, src_dir, src_dir, options, &mut count)?;
    zip.finish()?;

    info!("Created '{}' with {} file(s)", dest.display(), count);
    Ok(dest.to_path_buf())
}

fn add_dir_recursively(
    zip: &mut ZipWriter<BufWriter<File>>,
    base_dir: &Path,
    dir: &Path,
    options: FileOptions,
    count: &mut usize,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let name = path
            .strip_prefix(base_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_file() {
            zip.start_file(name, options)?;
            let mut f = File::open(&path)?;
            std::io::copy(&mut f, zip)?;
            *count += 1;
        } else if path.is_dir() {
            zip.add_directory(name, options)?;
            add_dir_recursively(zip, base_dir, &path, options, count)?;
        }
    }
    Ok(())
}
