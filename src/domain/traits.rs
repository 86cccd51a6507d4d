// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the splitting core and the I/O around it.
//
// Why traits here?
//   The catalog, assigner and dataset only see these traits, so
//   tests can hand them an in-memory table or a fake volume store
//   and never touch the disk.
//
//   TableSource  → where the raw clinical table comes from
//                  (CsvTableLoader reads it from disk)
//   VolumeSource → resolves a subject id to an image volume
//                  (DiskVolumeAccessor reads .nii.gz / .npy)

use ndarray::ArrayD;

use crate::domain::table::RawTable;
use crate::domain::error::Result;

// ─── TableSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the raw subject table.
pub trait TableSource {
    /// Read the whole table, header row included.
    /// Null markers (empty, NA, NaN, ...) come back as `None` cells.
    fn load_table(&self) -> Result<RawTable>;
}

// ─── VolumeSource ─────────────────────────────────────────────────────────────
/// Any component that can load a subject's volume.
///
/// Implementations are shared read-only across loader worker
/// threads, hence the `Send + Sync` bound. The returned array
/// carries a leading channel axis.
pub trait VolumeSource: Send + Sync {
    /// Load the volume for `subject_id` as `[channel, d, h, w]`.
    /// A file that is not on disk is `Error::MissingVolume`.
    fn load_volume(&self, subject_id: &str) -> Result<ArrayD<f32>>;
}
