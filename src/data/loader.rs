// ============================================================
// Layer 4 — Metadata Table Loader
// ============================================================
// Reads the subject-level clinical table from a CSV file using
// the csv crate.
//
// The table is kept as untyped string cells at this stage:
//   - the first record is the header
//   - cells matching a null marker become None
//   - surrounding whitespace is trimmed
//
// Typing (age → f64, sex → one-hot, ...) belongs to the catalog.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::domain::error::{Error, Result};
use crate::domain::table::{is_null_cell, RawTable};
use crate::domain::traits::TableSource;

/// Loads the metadata table from a CSV file on disk.
pub struct CsvTableLoader {
    /// Path of the CSV file, header row first
    path: PathBuf,
}

impl CsvTableLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvTableLoader {
    fn load_table(&self) -> Result<RawTable> {
        if !self.path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("metadata table '{}' does not exist", self.path.display()),
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Vec<Option<String>> = record
                .iter()
                .map(|cell| (!is_null_cell(cell)).then(|| cell.to_string()))
                .collect();
            rows.push(row);
        }

        tracing::info!(
            "Loaded metadata table '{}': {} rows, {} columns",
            self.path.display(),
            rows.len(),
            headers.len()
        );

        RawTable::new(headers, rows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_loads_headers_and_nulls() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        fs::write(
            &path,
            "Subject,PTGENDER,AGE,Group\n002_S_0295,Male,84.8,CN\n002_S_0413, Female ,,MCI\n",
        )
        .unwrap();

        let table = CsvTableLoader::new(&path).load_table().unwrap();
        assert_eq!(table.headers(), &["Subject", "PTGENDER", "AGE", "Group"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), Some("Female"));
        assert_eq!(table.cell(1, 2), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = CsvTableLoader::new(dir.path().join("nope.csv")).load_table().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
