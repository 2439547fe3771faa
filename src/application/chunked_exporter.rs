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

//! # Chunked table export
//!
//! Writes one table to `<output_dir>/<TABLE>.csv`, either in a single read or
//! as a sequence of fixed-size pages so that only one page of rows is ever
//! held in memory.
//!
//! ## Paging rules
//! - The first page written creates the file with a header row; every later
//!   page is appended without one.
//! - A non-zero resume offset starts at that row and appends from the very
//!   first page, continuing a file left behind by an interrupted run.
//! - A page that is empty or shorter than the chunk size ends the table. A
//!   table whose size is an exact multiple of the chunk size therefore costs
//!   one extra (empty) page request.

use crate::domain::entities::{ExportChunk, TableDescriptor, TableExportStats};
use crate::domain::errors::{ExportError, Result};
use crate::ports::source_port::SourceDatabase;
use csv::WriterBuilder;
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// How a table is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// One unrestricted read, written once.
    Full,
    Chunked {
        resume_offset: u64,
        /// Issue a `COUNT(*)` first so progress can be shown as a percentage.
        count_rows: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Append,
}

pub struct ChunkedExporter {
    output_dir: PathBuf,
    chunk_size: u64,
}

impl ChunkedExporter {
    pub fn new(output_dir: impl Into<PathBuf>, chunk_size: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn output_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", table))
    }

    pub fn export_table(
        &self,
        db: &mut dyn SourceDatabase,
        table: &TableDescriptor,
        mode: ExtractionMode,
    ) -> Result<TableExportStats> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExportError::query(&table.name, e))?;

        match mode {
            ExtractionMode::Full => self.export_full(db, &table.name),
            ExtractionMode::Chunked {
                resume_offset,
                count_rows,
            } => self.export_chunked(db, &table.name, resume_offset, count_rows),
        }
    }

    fn export_full(&self, db: &mut dyn SourceDatabase, table: &str) -> Result<TableExportStats> {
        info!("Reading entire table '{}'", table);
        let start = Instant::now();

        let columns = db.table_columns(table)?;
        let rows = db.fetch_all(table)?;
        let chunk = ExportChunk {
            table_name: table.to_string(),
            offset_start: 0,
            row_count: rows.len(),
            columns,
            rows,
        };
        info!(
            "Fetched {} rows in {:.1}s",
            chunk.row_count,
            start.elapsed().as_secs_f64()
        );

        let path = self.output_path(table);
        write_chunk(&path, &chunk, WriteMode::Create)?;
        info!("Saved to '{}'", path.display());

        Ok(TableExportStats {
            rows: chunk.row_count as u64,
            pages: 1,
        })
    }

    fn export_chunked(
        &self,
        db: &mut dyn SourceDatabase,
        table: &str,
        resume_offset: u64,
        count_rows: bool,
    ) -> Result<TableExportStats> {
        info!(
            "Reading table '{}' in chunks of {} rows",
            table, self.chunk_size
        );

        let columns = db.table_columns(table)?;

        // Only used for the percentage in the logs.
        let table_size = if count_rows {
            match db.count_rows(table) {
                Ok(n) => {
                    info!("Table has {} row(s)", n);
                    Some(n)
                }
                Err(e) => {
                    warn!("Could not count rows of '{}', continuing without it: {}", table, e);
                    None
                }
            }
        } else {
            None
        };

        if resume_offset > 0 {
            info!("Continuing previous extraction; skipping {} rows", resume_offset);
        }

        let path = self.output_path(table);
        let mut offset = resume_offset;
        let mut write_mode = if resume_offset > 0 {
            WriteMode::Append
        } else {
            WriteMode::Create
        };
        let mut stats = TableExportStats::default();

        loop {
            let rows = db.fetch_page(table, self.chunk_size, offset)?;
            let chunk = ExportChunk {
                table_name: table.to_string(),
                offset_start: offset,
                row_count: rows.len(),
                columns: columns.clone(),
                rows,
            };
            stats.pages += 1;
            stats.rows += chunk.row_count as u64;

            let read_so_far = chunk.offset_start + chunk.row_count as u64;
            match table_size {
                Some(total) if total > 0 => {
                    let pct = (read_so_far as f64 / total as f64 * 10_000.0).round() / 100.0;
                    info!(
                        "Fetched {} rows -- ({}%) {} read of {} total",
                        chunk.row_count, pct, read_so_far, total
                    );
                }
                _ => info!("Fetched {} rows -- {} read", chunk.row_count, read_so_far),
            }

            write_chunk(&path, &chunk, write_mode)?;
            write_mode = WriteMode::Append;

            if chunk.row_count == 0 {
                info!("Fetched no rows; assuming end of table");
                break;
            }
            if chunk.is_terminal(self.chunk_size) {
                info!(
                    "Fetched fewer rows than chunk size ({}); assuming end of table",
                    self.chunk_size
                );
                break;
            }
            offset += self.chunk_size;
        }

        info!("Saved {} rows of '{}' to '{}'", stats.rows, table, path.display());
        Ok(stats)
    }
}

/// Writes a page: `Create` truncates and adds the header, `Append` adds rows only.
fn write_chunk(path: &Path, chunk: &ExportChunk, mode: WriteMode) -> Result<()> {
    let table = chunk.table_name.as_str();
    let file = match mode {
        WriteMode::Create => File::create(path),
        WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
    }
    .map_err(|e| ExportError::query(table, e))?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(128 * 1024, file));

    if mode == WriteMode::Create {
        wtr.write_record(&chunk.columns)
            .map_err(|e| ExportError::query(table, e))?;
    }
    for row in &chunk.rows {
        wtr.write_record(row)
            .map_err(|e| ExportError::query(table, e))?;
    }
    wtr.flush().map_err(|e| ExportError::query(table, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_doubles::InMemoryDatabase;

    fn chunked(resume_offset: u64, count_rows: bool) -> ExtractionMode {
        ExtractionMode::Chunked {
            resume_offset,
            count_rows,
        }
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_five_rows_in_pages_of_two() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("T", 5);
        let exporter = ChunkedExporter::new(dir.path(), 2);

        let stats = exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(0, true))
            .unwrap();

        assert_eq!(stats, TableExportStats { rows: 5, pages: 3 });
        assert_eq!(db.page_requests("T"), vec![(2, 0), (2, 2), (2, 4)]);
        let content = read(&exporter.output_path("T"));
        assert_eq!(content.lines().count(), 6);
        assert!(content.starts_with("ID,NAME\n0,name-0\n"));
        assert!(content.ends_with("4,name-4\n"));
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("EMPTY", 0);
        let exporter = ChunkedExporter::new(dir.path(), 10);

        let stats = exporter
            .export_table(&mut db, &TableDescriptor::new("EMPTY"), chunked(0, false))
            .unwrap();

        assert_eq!(stats, TableExportStats { rows: 0, pages: 1 });
        assert_eq!(read(&exporter.output_path("EMPTY")), "ID,NAME\n");
    }

    #[test]
    fn test_exact_multiple_needs_one_extra_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("T", 4);
        let exporter = ChunkedExporter::new(dir.path(), 2);

        exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(0, false))
            .unwrap();

        assert_eq!(db.page_requests("T"), vec![(2, 0), (2, 2), (2, 4)]);
        assert_eq!(read(&exporter.output_path("T")).lines().count(), 5);
    }

    #[test]
    fn test_chunked_matches_full_export_and_page_count() {
        for n in [0usize, 1, 2, 3, 7, 10, 12] {
            for c in [1u64, 2, 3, 5, 10] {
                let full_dir = tempfile::tempdir().unwrap();
                let chunk_dir = tempfile::tempdir().unwrap();
                let mut db = InMemoryDatabase::new().with_numbered_table("T", n);
                let table = TableDescriptor::new("T");

                let full = ChunkedExporter::new(full_dir.path(), c);
                full.export_table(&mut db, &table, ExtractionMode::Full).unwrap();
                let paged = ChunkedExporter::new(chunk_dir.path(), c);
                let stats = paged.export_table(&mut db, &table, chunked(0, false)).unwrap();

                assert_eq!(
                    read(&full.output_path("T")),
                    read(&paged.output_path("T")),
                    "n={} c={}",
                    n,
                    c
                );
                let n = n as u64;
                let expected_pages = if n % c == 0 { n / c + 1 } else { (n + c - 1) / c };
                assert_eq!(stats.pages, expected_pages, "n={} c={}", n, c);
                assert_eq!(db.page_requests("T").len() as u64, expected_pages);
                assert_eq!(stats.rows, n);
            }
        }
    }

    #[test]
    fn test_resume_continues_existing_file() {
        let n = 7;
        for k in 0..=n {
            let dir = tempfile::tempdir().unwrap();
            let mut db = InMemoryDatabase::new().with_numbered_table("T", n);
            let table = TableDescriptor::new("T");
            let exporter = ChunkedExporter::new(dir.path(), 3);

            exporter.export_table(&mut db, &table, chunked(0, false)).unwrap();
            let complete = read(&exporter.output_path("T"));

            // Simulate an interrupted run that got the header and k rows out.
            let partial: String = complete
                .lines()
                .take(k + 1)
                .map(|l| format!("{}\n", l))
                .collect();
            std::fs::write(exporter.output_path("T"), partial).unwrap();

            let stats = exporter
                .export_table(&mut db, &table, chunked(k as u64, false))
                .unwrap();

            assert_eq!(read(&exporter.output_path("T")), complete, "k={}", k);
            assert_eq!(stats.rows, (n - k) as u64);
        }
    }

    #[test]
    fn test_resume_first_page_starts_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("T", 24);
        let exporter = ChunkedExporter::new(dir.path(), 10);

        exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(5, false))
            .unwrap();

        // 19 rows after the offset: one full page, then a short one.
        assert_eq!(db.page_requests("T"), vec![(10, 5), (10, 15)]);
        // No header was written on the resumed page.
        assert!(read(&exporter.output_path("T")).starts_with("5,name-5\n"));
    }

    #[test]
    fn test_count_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("T", 3).failing_count();
        let exporter = ChunkedExporter::new(dir.path(), 2);

        let stats = exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(0, true))
            .unwrap();

        assert_eq!(db.count_calls(), vec!["T".to_string()]);
        assert_eq!(stats.rows, 3);
    }

    #[test]
    fn test_count_skipped_when_not_requested() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_numbered_table("T", 3);
        let exporter = ChunkedExporter::new(dir.path(), 2);

        exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(0, false))
            .unwrap();

        assert!(db.count_calls().is_empty());
    }

    #[test]
    fn test_page_failure_is_query_failure_and_keeps_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new()
            .with_numbered_table("T", 10)
            .failing_page("T", 4);
        let exporter = ChunkedExporter::new(dir.path(), 2);

        let err = exporter
            .export_table(&mut db, &TableDescriptor::new("T"), chunked(0, false))
            .unwrap_err();

        assert_eq!(err.kind(), "QueryFailure");
        assert_eq!(read(&exporter.output_path("T")).lines().count(), 5);
    }

    #[test]
    fn test_full_export_quotes_awkward_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InMemoryDatabase::new().with_table(
            "T",
            &["ID", "NOTE"],
            vec![vec!["1".into(), "a, \"quoted\" note".into()], vec!["2".into(), "".into()]],
        );
        let exporter = ChunkedExporter::new(dir.path(), 2);

        exporter
            .export_table(&mut db, &TableDescriptor::new("T"), ExtractionMode::Full)
            .unwrap();

        assert_eq!(db.full_reads(), vec!["T".to_string()]);
        assert_eq!(
            read(&exporter.output_path("T")),
            "ID,NOTE\n1,\"a, \"\"quoted\"\" note\"\n2,\n"
        );
    }
}
