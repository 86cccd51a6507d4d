// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits that name the concepts
// of the system: subjects, folds, roles, and the errors raised
// when the table or a request violates an invariant.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only plain data, validation, and traits

/// The error taxonomy and Result alias
pub mod error;

/// Cleaned subject rows, sex, class count, relabeling
pub mod subject;

/// Fold assignment and role
pub mod fold;

/// TableSource and VolumeSource
pub mod traits;

/// The raw table of string cells before cleaning
pub mod table;
