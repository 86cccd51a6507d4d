// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw metadata CSV to tensor batches.
//
//   metadata.csv
//       │
//       ▼
//   CsvTableLoader          → raw string cells, nulls marked
//       │
//       ▼
//   MetadataCatalog         → cleaned subject records
//       │
//       ▼
//   StratifiedFoldAssigner  → row → fold (once per seed)
//       │
//       ▼
//   SplitSelector           → train / valid / test rows
//       │
//       ▼
//   SubjectDataset          → Burn Dataset, volumes via
//       │                     DiskVolumeAccessor
//       ▼
//   SubjectBatcher          → stacked tensors
//       │
//       ▼
//   DataLoader              → batches for the trainer
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the metadata CSV into a RawTable
pub mod loader;

/// Numbered clinical feature selections
pub mod feature_sets;

/// Cleans the raw table into subject records
pub mod catalog;

/// Stratified round-robin fold assignment
pub mod stratify;

/// Train / valid / test row selection
pub mod splitter;

/// Subject volume loading from disk
pub mod volume;

/// Burn Dataset over one role's rows
pub mod dataset;

/// Burn Batcher producing tensor batches
pub mod batcher;

/// Catalog plus its cached fold assignment
pub mod cohort;
