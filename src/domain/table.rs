// ============================================================
// Layer 3 — Raw Table
// ============================================================
// The clinical table as read from disk: a header row plus rows
// of optional string cells. `None` marks a null cell. Cleaning
// and typing happen later, in the catalog.

use crate::domain::error::{Error, Result};

/// Cell spellings treated as null, matching the usual CSV
/// export conventions of the cohort spreadsheets.
pub const NULL_MARKERS: [&str; 10] =
    ["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "<NA>"];

/// True when a raw cell should be read as null
pub fn is_null_cell(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell.trim())
}

/// Header names plus rows of optional cells, all of equal width
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names in file order
    headers: Vec<String>,

    /// One Vec per data row; `None` is a null cell
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table. Every row must have one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(Error::integrity(
                "<row width>",
                format!("row {} has {} cells, header has {}", i, row.len(), headers.len()),
            ));
        }
        Ok(Self { headers, rows })
    }

    /// Build from string cells, applying the null markers
    pub fn from_strings(headers: &[&str], rows: &[Vec<&str>]) -> Result<Self> {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|c| (!is_null_cell(c)).then(|| c.trim().to_string()))
                    .collect()
            })
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column the caller cannot do without
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::integrity(name, "required column is absent from the table"))
    }

    /// Non-null cell at (row, column)
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_markers() {
        assert!(is_null_cell(""));
        assert!(is_null_cell(" NaN "));
        assert!(!is_null_cell("0"));
    }

    #[test]
    fn test_from_strings_marks_nulls() {
        let t = RawTable::from_strings(&["Subject", "AGE"], &[vec!["s1", "NA"], vec!["s2", "71.5"]])
            .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(0, 1), None);
        assert_eq!(t.cell(1, 1), Some("71.5"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let r = RawTable::from_strings(&["a", "b"], &[vec!["1"]]);
        assert!(r.is_err());
    }

    #[test]
    fn test_require_column() {
        let t = RawTable::from_strings(&["Subject"], &[]).unwrap();
        assert!(t.require_column("Subject").is_ok());
        let err = t.require_column("Group").unwrap_err();
        assert!(err.to_string().contains("Group"));
    }
}
