// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Every failure the cohort pipeline can raise, as one enum.
//
//   Configuration  → unknown feature set, class count, role, bin count
//   DataIntegrity  → empty table, missing column, bad one-hot,
//                    unmapped label, unparseable cell
//   InvalidFold    → fold outside 0..=3 for train/valid
//   MissingVolume  → a subject's scan or mask is not on disk
//
// Wrapped I/O and parser errors keep their source attached.
// The application and CLI layers convert into anyhow::Error.

use std::path::PathBuf;

/// Result alias used by the domain and data layers
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An unrecognised selector or option value
    #[error("configuration error: {setting} = '{value}' is not recognised ({expected})")]
    Configuration {
        setting:  &'static str,
        value:    String,
        expected: String,
    },

    /// The table violates an invariant the splitter depends on
    #[error("data integrity error in column '{column}': {reason}")]
    DataIntegrity {
        column: String,
        reason: String,
    },

    /// A fold that cannot be used for the requested role
    #[error("invalid fold {fold} for role '{role}': valid folds are 0..={max}")]
    InvalidFold {
        fold: usize,
        role: String,
        max:  usize,
    },

    /// The volume (or its brain mask) for a subject is not on disk
    #[error("missing volume for subject '{subject}': {}", path.display())]
    MissingVolume {
        subject: String,
        path:    PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("npy read error in '{}': {source}", path.display())]
    Npy {
        path:   PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("NIfTI read error in '{}': {source}", path.display())]
    Nifti {
        path:   PathBuf,
        #[source]
        source: nifti::NiftiError,
    },
}

impl Error {
    /// Shorthand for a `DataIntegrity` error
    pub fn integrity(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DataIntegrity {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Configuration` error
    pub fn configuration(
        setting:  &'static str,
        value:    impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        Error::Configuration {
            setting,
            value:    value.to_string(),
            expected: expected.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_error_states_valid_range() {
        let e = Error::InvalidFold { fold: 4, role: "valid".into(), max: 3 };
        let msg = e.to_string();
        assert!(msg.contains("0..=3"));
        assert!(msg.contains("valid"));
    }

    #[test]
    fn test_integrity_error_names_column() {
        let e = Error::integrity("PTGENDER", "no rows left after filtering");
        assert!(e.to_string().contains("PTGENDER"));
    }

    #[test]
    fn test_configuration_error_names_value() {
        let e = Error::configuration("num_classes", 4, "expected 3 or 5");
        let msg = e.to_string();
        assert!(msg.contains("num_classes"));
        assert!(msg.contains("'4'"));
    }
}
