//! Parallel JSON export using rayon.
//!
//! The database is immutable and trivially shareable, so whole-database
//! exports fan out over rayon's work-stealing pool, one main record per
//! task.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use super::JsonExporter;
use crate::database::Database;
use crate::layout::RecordEntry;
use crate::{Error, Result};

/// Parallel JSON exporter.
pub struct ParallelJsonExporter<'a> {
    database: &'a Database,
}

impl<'a> ParallelJsonExporter<'a> {
    /// Create a new parallel exporter.
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// Export all main records to a directory, one `.json` file per record.
    ///
    /// The progress callback receives `(completed, total)` counts.
    pub fn export_all<P: AsRef<Path>, F>(&self, output_dir: P, mut progress: F) -> Result<ExportStats>
    where
        F: FnMut(usize, usize) + Send,
    {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let main_records: Vec<_> = self.database.main_records().collect();
        let total = main_records.len();

        let exported = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);
        let progress = Mutex::new(&mut progress);

        main_records.par_iter().for_each(|record| {
            match self.export_single_record(record, output_dir) {
                Ok(()) => exported.fetch_add(1, Ordering::Relaxed),
                Err(_) => errors.fetch_add(1, Ordering::Relaxed),
            };

            let done = exported.load(Ordering::Relaxed) + errors.load(Ordering::Relaxed);
            if done % 100 == 0 || done == total {
                if let Some(mut p) = progress.try_lock() {
                    (*p)(done, total);
                }
            }
        });

        let stats = ExportStats {
            exported: exported.load(Ordering::Relaxed),
            errors: errors.load(Ordering::Relaxed),
            total,
        };

        progress.lock()(total, total);
        Ok(stats)
    }

    /// Export records in parallel, returning JSON strings.
    pub fn export_to_strings(&self, records: &[&RecordEntry]) -> Vec<Result<String>> {
        let exporter = JsonExporter::new(self.database);

        records
            .par_iter()
            .map(|record| exporter.export_record_string(record))
            .collect()
    }

    fn export_single_record(&self, record: &RecordEntry, output_dir: &Path) -> Result<()> {
        let exporter = JsonExporter::new(self.database);

        let file_name = self
            .database
            .record_file_name(record)
            .unwrap_or("unknown")
            .replace('/', std::path::MAIN_SEPARATOR_STR);
        let output_path = output_dir.join(file_name).with_extension("json");

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = exporter.export_record_string(record)?;
        std::fs::write(&output_path, json).map_err(|e| Error::Export(e.to_string()))?;

        Ok(())
    }
}

/// Statistics from a parallel export run.
#[derive(Debug, Clone, Copy)]
pub struct ExportStats {
    /// Number of records successfully exported.
    pub exported: usize,
    /// Number of records that failed to export.
    pub errors: usize,
    /// Total number of records attempted.
    pub total: usize,
}

impl ExportStats {
    /// Check if every record was exported.
    pub fn is_complete(&self) -> bool {
        self.errors == 0 && self.exported == self.total
    }
}
