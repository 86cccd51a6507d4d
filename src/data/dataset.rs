// ============================================================
// Layer 4 — Subject Dataset
// ============================================================
// One role's view (train, valid or test) over the catalog.
// Implements Burn's Dataset trait so a DataLoader can call
// .get(index) and .len() on it from its worker threads.
//
// Each item is the triple the downstream model consumes:
//   volume   → from the VolumeSource, channel axis first
//   features → [female, male, age?, clinical...] as f32
//   target   → class id or normalised age
//
// The catalog rows are an Arc snapshot shared read-only by every
// view built from the same cohort.
//
// Why record load failures instead of returning them?
//   Burn's Dataset::get can only answer Some or None, and the
//   loader ends its pass at the first None. The first error is
//   kept in a LoadFailures handle that the caller clones before
//   handing the dataset to the loader and checks after the pass,
//   so a missing volume reaches the caller as the original
//   MissingVolume error instead of a short epoch.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;
use ndarray::ArrayD;
use std::sync::{Arc, Mutex};

use crate::domain::error::{Error, Result};
use crate::domain::fold::Role;
use crate::domain::subject::{SubjectRecord, Target, TargetValue};
use crate::domain::traits::VolumeSource;

/// One fully resolved subject sample
#[derive(Debug, Clone)]
pub struct SubjectItem {
    /// Catalog subject id, also the volume lookup key
    pub subject_id: String,

    /// Image volume with a leading channel axis `[c, d, h, w]`
    pub volume: ArrayD<f32>,

    /// `[female, male, age_norm?, clinical...]`
    pub features: Vec<f32>,

    /// Class id or normalised age
    pub target: TargetValue,
}

// ─── LoadFailures ─────────────────────────────────────────────────────────────
/// Shared slot holding the first error raised by `Dataset::get`.
///
/// Clones share the slot, so a handle taken before the dataset is
/// moved into a DataLoader still sees errors from worker threads.
#[derive(Debug, Clone, Default)]
pub struct LoadFailures {
    first: Arc<Mutex<Option<Error>>>,
}

impl LoadFailures {
    /// Keep `err` unless an earlier error is already held
    fn record(&self, err: Error) {
        if let Ok(mut slot) = self.first.lock() {
            slot.get_or_insert(err);
        }
    }

    /// Remove and return the first recorded error
    pub fn take(&self) -> Option<Error> {
        self.first.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// One role's rows over a shared catalog snapshot
pub struct SubjectDataset {
    role: Role,

    /// Shared catalog rows, never mutated
    records: Arc<[SubjectRecord]>,

    /// Catalog rows of this view, in iteration order
    rows: Vec<usize>,

    target: Target,

    volumes: Arc<dyn VolumeSource>,

    /// Every item, once `preload` has run
    cache: Option<Vec<SubjectItem>>,

    /// First error swallowed by `get`
    failures: LoadFailures,
}

impl SubjectDataset {
    /// Build a view over `rows` of `records`.
    ///
    /// Every row must exist and every label must resolve for
    /// `target`, so `get` can only fail on volume I/O.
    pub fn new(
        role:    Role,
        records: Arc<[SubjectRecord]>,
        rows:    Vec<usize>,
        target:  Target,
        volumes: Arc<dyn VolumeSource>,
    ) -> Result<Self> {
        for &row in &rows {
            let record = records.get(row).ok_or_else(|| {
                Error::integrity("row", format!("row {row} is outside 0..{}", records.len()))
            })?;
            record.target_value(target)?;
        }

        tracing::debug!("Built {} dataset with {} subjects", role, rows.len());
        Ok(Self {
            role,
            records,
            rows,
            target,
            volumes,
            cache:    None,
            failures: LoadFailures::default(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Handle to the errors `get` swallows; clone it before the
    /// dataset is moved into a loader
    pub fn failures(&self) -> LoadFailures {
        self.failures.clone()
    }

    /// Catalog rows in iteration order
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn subject_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|&r| self.records[r].subject_id.as_str())
    }

    pub fn is_preloaded(&self) -> bool {
        self.cache.is_some()
    }

    /// Load every item into memory. Fails on the first volume
    /// that cannot be read; on failure nothing is cached.
    pub fn preload(&mut self) -> Result<()> {
        let total = self.rows.len();
        let mut items = Vec::with_capacity(total);

        for (i, &row) in self.rows.iter().enumerate() {
            items.push(self.resolve(row)?);
            if (i + 1) % 100 == 0 {
                tracing::info!("Loading {} data to RAM: {}/{}", self.role, i + 1, total);
            }
        }

        tracing::info!("Loaded {} {} subjects to RAM", items.len(), self.role);
        self.cache = Some(items);
        Ok(())
    }

    fn resolve(&self, row: usize) -> Result<SubjectItem> {
        let record = &self.records[row];
        Ok(SubjectItem {
            subject_id: record.subject_id.clone(),
            volume:     self.volumes.load_volume(&record.subject_id)?,
            features:   record.feature_vector(self.target),
            target:     record.target_value(self.target)?,
        })
    }
}

impl Dataset<SubjectItem> for SubjectDataset {
    fn get(&self, index: usize) -> Option<SubjectItem> {
        if let Some(cache) = &self.cache {
            return cache.get(index).cloned();
        }

        let row = *self.rows.get(index)?;
        match self.resolve(row) {
            Ok(item) => Some(item),
            // The loader ends its pass at the first None
            Err(e) => {
                tracing::warn!("Cannot load {} item {}: {}", self.role, index, e);
                self.failures.record(e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subject::{ClassCount, Sex};
    use ndarray::IxDyn;

    /// Serves a constant volume for every subject except "ghost"
    struct FakeVolumes;

    impl VolumeSource for FakeVolumes {
        fn load_volume(&self, subject_id: &str) -> Result<ArrayD<f32>> {
            if subject_id == "ghost" {
                return Err(Error::MissingVolume {
                    subject: subject_id.to_string(),
                    path:    "ghost/brain_scan.nii.gz".into(),
                });
            }
            Ok(ArrayD::from_elem(IxDyn(&[1, 2, 2, 2]), 1.0))
        }
    }

    fn records() -> Arc<[SubjectRecord]> {
        let mk = |id: &str, label: &str, sex| SubjectRecord {
            subject_id: id.into(),
            label:      label.into(),
            sex,
            age:        70.0,
            age_norm:   0.7,
            clinical:   vec![12.0],
        };
        vec![mk("a", "CN", Sex::Female), mk("ghost", "AD", Sex::Male), mk("c", "EMCI", Sex::Male)].into()
    }

    fn dataset(rows: Vec<usize>) -> Result<SubjectDataset> {
        SubjectDataset::new(
            Role::Valid,
            records(),
            rows,
            Target::Classification(ClassCount::Three),
            Arc::new(FakeVolumes),
        )
    }

    #[test]
    fn test_get_resolves_triple() {
        let ds = dataset(vec![2, 0]).unwrap();
        assert_eq!(ds.len(), 2);

        let item = ds.get(0).unwrap();
        assert_eq!(item.subject_id, "c");
        assert_eq!(item.features, vec![0.0, 1.0, 0.7, 12.0]);
        assert_eq!(item.target, TargetValue::Class(1));
        assert_eq!(item.volume.shape(), &[1, 2, 2, 2]);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_missing_volume_is_recorded() {
        let ds       = dataset(vec![0, 1, 2]).unwrap();
        let failures = ds.failures();
        assert!(failures.take().is_none());

        assert!(ds.get(1).is_none());
        assert!(ds.get(2).is_some());

        let err = failures.take().unwrap();
        assert!(matches!(err, Error::MissingVolume { ref subject, .. } if subject == "ghost"));
        assert!(failures.take().is_none());
    }

    #[test]
    fn test_only_first_failure_is_kept() {
        let ds = dataset(vec![1]).unwrap();
        let _ = ds.get(0);
        let _ = ds.get(0);
        let failures = ds.failures();
        assert!(failures.take().is_some());
        assert!(failures.take().is_none());
    }

    #[test]
    fn test_preload_caches_or_fails() {
        let mut ok = dataset(vec![0, 2]).unwrap();
        ok.preload().unwrap();
        assert!(ok.is_preloaded());
        assert_eq!(ok.get(1).unwrap().subject_id, "c");

        let mut bad = dataset(vec![0, 1]).unwrap();
        let err = bad.preload().unwrap_err();
        assert!(matches!(err, Error::MissingVolume { .. }));
        assert!(!bad.is_preloaded());
    }

    #[test]
    fn test_out_of_range_row_rejected() {
        assert!(dataset(vec![0, 9]).is_err());
    }

    #[test]
    fn test_subject_ids_follow_row_order() {
        let ds = dataset(vec![2, 0]).unwrap();
        assert_eq!(ds.subject_ids().collect::<Vec<_>>(), vec!["c", "a"]);
    }
}
