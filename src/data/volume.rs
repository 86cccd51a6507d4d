// ============================================================
// Layer 4 — Volume Accessor
// ============================================================
// Resolves a subject id to its brain scan on disk and returns
// it as an f32 array with a leading channel axis.
//
// Which file is read is decided by VolumeOptions, not by type:
//
//   layout = SubjectDirectory        layout = FlatFiles
//     <root>/<subject>/                <root>/<subject>.<ext>
//       brain_scan.<ext>                 (no mask)
//       brain_scan_simple.<ext>
//       brain_mask.<ext>
//
//   format               → nii.gz (nifti crate) or npy (ndarray-npy)
//   bias_field_corrected → brain_scan vs brain_scan_simple
//   with_skull = false   → multiply the brain mask in
//   only_tabular         → skip the disk, return a zero placeholder
//
// Reference: nifti crate documentation (IntoNdArray)
//            ndarray-npy documentation (read_npy)

use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::{Error, Result};
use crate::domain::traits::VolumeSource;

/// Shape of the placeholder volume returned in tabular-only mode
pub const PLACEHOLDER_SHAPE: [usize; 4] = [1, 4, 4, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLayout {
    /// `<root>/<subject>/brain_scan[_simple].<ext>` plus `brain_mask.<ext>` (ADNI)
    SubjectDirectory,

    /// `<root>/<subject>.<ext>`, no mask (BrainAge)
    FlatFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeFormat {
    /// Gzipped NIfTI-1, `.nii.gz`
    Nifti,

    /// NumPy array, `.npy`, stored as f32 or f64
    Npy,
}

impl VolumeFormat {
    pub fn extension(self) -> &'static str {
        match self {
            VolumeFormat::Nifti => "nii.gz",
            VolumeFormat::Npy   => "npy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeOptions {
    /// Where a subject's files live under the root
    pub layout: VolumeLayout,

    /// File format of scans and masks
    pub format: VolumeFormat,

    /// Read `brain_scan` (true) or `brain_scan_simple` (false)
    pub bias_field_corrected: bool,

    /// Keep the skull; when false the brain mask is multiplied in
    pub with_skull: bool,

    /// Serve PLACEHOLDER_SHAPE zeros and never read the disk
    pub only_tabular: bool,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            layout:               VolumeLayout::SubjectDirectory,
            format:               VolumeFormat::Nifti,
            bias_field_corrected: true,
            with_skull:           false,
            only_tabular:         false,
        }
    }
}

/// Reads subject volumes from a directory tree.
#[derive(Debug, Clone)]
pub struct DiskVolumeAccessor {
    /// Root directory all volume paths are resolved against
    root: PathBuf,

    options: VolumeOptions,
}

impl DiskVolumeAccessor {
    pub fn new(root: impl Into<PathBuf>, options: VolumeOptions) -> Self {
        Self { root: root.into(), options }
    }

    pub fn options(&self) -> &VolumeOptions {
        &self.options
    }

    /// Path of the scan file for a subject
    pub fn scan_path(&self, subject_id: &str) -> PathBuf {
        let ext = self.options.format.extension();
        match self.options.layout {
            VolumeLayout::SubjectDirectory => {
                let stem = if self.options.bias_field_corrected { "brain_scan" } else { "brain_scan_simple" };
                self.root.join(subject_id).join(format!("{stem}.{ext}"))
            }
            VolumeLayout::FlatFiles => self.root.join(format!("{subject_id}.{ext}")),
        }
    }

    /// Path of the brain mask, when one should be applied
    pub fn mask_path(&self, subject_id: &str) -> Option<PathBuf> {
        match self.options.layout {
            VolumeLayout::SubjectDirectory if !self.options.with_skull => Some(
                self.root
                    .join(subject_id)
                    .join(format!("brain_mask.{}", self.options.format.extension())),
            ),
            _ => None,
        }
    }

    fn read(&self, subject_id: &str, path: &Path) -> Result<ArrayD<f32>> {
        if !path.is_file() {
            return Err(Error::MissingVolume {
                subject: subject_id.to_string(),
                path:    path.to_path_buf(),
            });
        }
        match self.options.format {
            VolumeFormat::Nifti => read_nifti(path),
            VolumeFormat::Npy   => read_npy_f32(path),
        }
    }
}

impl VolumeSource for DiskVolumeAccessor {
    fn load_volume(&self, subject_id: &str) -> Result<ArrayD<f32>> {
        if self.options.only_tabular {
            return Ok(ArrayD::zeros(IxDyn(&PLACEHOLDER_SHAPE)));
        }

        let scan_path = self.scan_path(subject_id);
        let mut img   = self.read(subject_id, &scan_path)?;
        if img.ndim() != 3 {
            return Err(Error::integrity(
                scan_path.display().to_string(),
                format!("expected a 3-D volume, got shape {:?}", img.shape()),
            ));
        }

        if let Some(mask_path) = self.mask_path(subject_id) {
            let mask = self.read(subject_id, &mask_path)?;
            if mask.shape() != img.shape() {
                return Err(Error::integrity(
                    mask_path.display().to_string(),
                    format!(
                        "mask shape {:?} does not match scan shape {:?}",
                        mask.shape(),
                        img.shape()
                    ),
                ));
            }
            img *= &mask;
        }

        tracing::trace!("Loaded volume for '{}' with shape {:?}", subject_id, img.shape());
        Ok(img.insert_axis(Axis(0)))
    }
}

fn read_nifti(path: &Path) -> Result<ArrayD<f32>> {
    use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

    let to_err = |source| Error::Nifti { path: path.to_path_buf(), source };
    let obj = ReaderOptions::new().read_file(path).map_err(to_err)?;
    obj.into_volume().into_ndarray::<f32>().map_err(to_err)
}

/// Read an .npy volume stored as f32, falling back to f64
fn read_npy_f32(path: &Path) -> Result<ArrayD<f32>> {
    match ndarray_npy::read_npy::<_, ArrayD<f32>>(path) {
        Ok(arr) => Ok(arr),
        Err(first) => match ndarray_npy::read_npy::<_, ArrayD<f64>>(path) {
            Ok(arr) => Ok(arr.mapv(|x| x as f32)),
            Err(_)  => Err(Error::Npy { path: path.to_path_buf(), source: first }),
        },
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use ndarray_npy::write_npy;
    use std::fs;
    use tempfile::tempdir;

    fn npy_options(with_skull: bool) -> VolumeOptions {
        VolumeOptions {
            format: VolumeFormat::Npy,
            with_skull,
            ..VolumeOptions::default()
        }
    }

    fn write_subject(root: &Path, subject: &str) {
        let dir = root.join(subject);
        fs::create_dir_all(&dir).unwrap();
        let scan = Array3::<f32>::from_elem((2, 3, 4), 5.0).into_dyn();
        let mut mask = Array3::<f32>::zeros((2, 3, 4));
        mask[[0, 0, 0]] = 1.0;
        mask[[1, 2, 3]] = 1.0;
        write_npy(dir.join("brain_scan.npy"), &scan).unwrap();
        write_npy(dir.join("brain_mask.npy"), &mask.into_dyn()).unwrap();
    }

    #[test]
    fn test_mask_is_applied_and_channel_added() {
        let dir = tempdir().unwrap();
        write_subject(dir.path(), "s0");

        let acc = DiskVolumeAccessor::new(dir.path(), npy_options(false));
        let vol = acc.load_volume("s0").unwrap();
        assert_eq!(vol.shape(), &[1, 2, 3, 4]);
        assert_eq!(vol.sum(), 10.0);
        assert_eq!(vol[[0, 1, 2, 3]], 5.0);
    }

    #[test]
    fn test_with_skull_skips_mask() {
        let dir = tempdir().unwrap();
        write_subject(dir.path(), "s0");

        let acc = DiskVolumeAccessor::new(dir.path(), npy_options(true));
        assert_eq!(acc.load_volume("s0").unwrap().sum(), 5.0 * 24.0);
    }

    #[test]
    fn test_missing_scan_is_missing_volume() {
        let dir = tempdir().unwrap();
        let acc = DiskVolumeAccessor::new(dir.path(), npy_options(true));
        let err = acc.load_volume("nobody").unwrap_err();
        assert!(matches!(err, Error::MissingVolume { ref subject, .. } if subject == "nobody"));
    }

    #[test]
    fn test_mask_shape_mismatch_is_integrity_error() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("s0");
        fs::create_dir_all(&sub).unwrap();
        write_npy(sub.join("brain_scan.npy"), &Array3::<f32>::ones((2, 2, 2)).into_dyn()).unwrap();
        write_npy(sub.join("brain_mask.npy"), &Array3::<f32>::ones((2, 2, 3)).into_dyn()).unwrap();

        let acc = DiskVolumeAccessor::new(dir.path(), npy_options(false));
        assert!(matches!(acc.load_volume("s0"), Err(Error::DataIntegrity { .. })));
    }

    #[test]
    fn test_f64_npy_is_converted() {
        let dir = tempdir().unwrap();
        let opts = VolumeOptions { layout: VolumeLayout::FlatFiles, ..npy_options(false) };
        write_npy(dir.path().join("sub-01.npy"), &Array3::<f64>::from_elem((2, 2, 2), 0.5).into_dyn())
            .unwrap();

        let vol = DiskVolumeAccessor::new(dir.path(), opts).load_volume("sub-01").unwrap();
        assert_eq!(vol.shape(), &[1, 2, 2, 2]);
        assert_eq!(vol.sum(), 4.0);
    }

    #[test]
    fn test_only_tabular_never_touches_disk() {
        let opts = VolumeOptions { only_tabular: true, ..VolumeOptions::default() };
        let vol = DiskVolumeAccessor::new("/does/not/exist", opts).load_volume("s0").unwrap();
        assert_eq!(vol.shape(), &PLACEHOLDER_SHAPE);
    }

    #[test]
    fn test_paths_follow_options() {
        let acc = DiskVolumeAccessor::new("/adni", VolumeOptions {
            bias_field_corrected: false,
            ..VolumeOptions::default()
        });
        assert_eq!(acc.scan_path("s0"), PathBuf::from("/adni/s0/brain_scan_simple.nii.gz"));
        assert_eq!(acc.mask_path("s0"), Some(PathBuf::from("/adni/s0/brain_mask.nii.gz")));

        let flat = DiskVolumeAccessor::new("/brainage/data", VolumeOptions {
            layout: VolumeLayout::FlatFiles,
            format: VolumeFormat::Npy,
            ..VolumeOptions::default()
        });
        assert_eq!(flat.scan_path("s1"), PathBuf::from("/brainage/data/s1.npy"));
        assert_eq!(flat.mask_path("s1"), None);
    }
}
