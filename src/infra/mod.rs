// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File output shared by the use cases:
//
//   split_store.rs : fold_assignment.json, subject_folds.csv and
//                    split_config.json; reading a stored split
//                    back re-validates it as a partition.
//
//   composition.rs : per-fold size / sex / label / age summary,
//                    logged and written as fold_composition.csv.

/// Fold assignment and config persistence
pub mod split_store;

/// Per-fold composition report
pub mod composition;
