// ============================================================
// Layer 2 — SplitUseCase
// ============================================================
// Computes the stratified 5-fold assignment for a cohort and
// writes it to disk:
//
//   Step 1: Read the clinical table        (Layer 4 - data)
//   Step 2: Clean it into a catalog        (Layer 4 - data)
//   Step 3: Assign every subject a fold    (Layer 4 - data)
//   Step 4: Report per-fold composition    (Layer 6 - infra)
//   Step 5: Store assignment + config      (Layer 6 - infra)
//
// `prepare_cohort` covers steps 1-3 and is shared with the
// load use case.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    catalog::{CatalogConfig, MetadataCatalog},
    cohort::AssignedCohort,
    feature_sets::FeatureSetRegistry,
    loader::CsvTableLoader,
    stratify::{StratifiedFoldAssigner, DEFAULT_AGE_BINS},
};
use crate::domain::traits::TableSource;
use crate::infra::{composition, split_store::SplitStore};

pub const DEFAULT_SPLIT_SEED: u64 = 0;

// ─── Cohort Configuration ─────────────────────────────────────────────────────
// Everything that determines which subject lands in which fold.
// Two runs with equal CohortConfigs over the same table produce
// the same assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    pub metadata_path:     String,
    pub feature_sets_path: Option<String>,
    pub catalog:           CatalogConfig,
    pub split_seed:        u64,
    pub age_bins:          usize,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            metadata_path:     "data/ADNIMERGE.csv".to_string(),
            feature_sets_path: None,
            catalog:           CatalogConfig::default(),
            split_seed:        DEFAULT_SPLIT_SEED,
            age_bins:          DEFAULT_AGE_BINS,
        }
    }
}

impl CohortConfig {
    fn feature_sets(&self) -> Result<FeatureSetRegistry> {
        match &self.feature_sets_path {
            Some(path) => FeatureSetRegistry::from_json_file(Path::new(path))
                .with_context(|| format!("Cannot load feature sets from '{path}'")),
            None => Ok(FeatureSetRegistry::default()),
        }
    }
}

/// Read and clean the clinical table described by `cfg`
pub fn build_catalog(cfg: &CohortConfig) -> Result<MetadataCatalog> {
    tracing::info!("Reading clinical table '{}'", cfg.metadata_path);
    let table = CsvTableLoader::new(&cfg.metadata_path)
        .load_table()
        .with_context(|| format!("Cannot read clinical table '{}'", cfg.metadata_path))?;

    let registry = cfg.feature_sets()?;
    let catalog  = MetadataCatalog::build(&table, &cfg.catalog, &registry)
        .context("Cannot build the metadata catalog")?;
    tracing::info!(
        "Catalog holds {} subjects ({} rows dropped, {} clinical features)",
        catalog.len(),
        catalog.dropped().total(),
        catalog.clinical_columns().len(),
    );
    Ok(catalog)
}

/// Read, clean and fold-assign the cohort described by `cfg`
pub fn prepare_cohort(cfg: &CohortConfig) -> Result<AssignedCohort> {
    let catalog  = build_catalog(cfg)?;
    let assigner = StratifiedFoldAssigner::new(cfg.split_seed).with_bins(cfg.age_bins);
    let cohort   = AssignedCohort::new(catalog, &assigner).context("Cannot assign folds")?;
    tracing::info!(
        "Assigned folds with seed {} and {} age bins: sizes {:?}",
        cfg.split_seed,
        cfg.age_bins,
        cohort.assignment().fold_sizes(),
    );
    Ok(cohort)
}

// ─── Split Configuration ──────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub cohort:  CohortConfig,
    pub out_dir: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            cohort:  CohortConfig::default(),
            out_dir: "splits".to_string(),
        }
    }
}

/// Files written by one split run
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub subjects:    usize,
    pub fold_sizes:  Vec<usize>,
    pub assignment:  PathBuf,
    pub subject_map: PathBuf,
    pub composition: PathBuf,
}

// ─── SplitUseCase ─────────────────────────────────────────────────────────────
pub struct SplitUseCase {
    config: SplitConfig,
}

impl SplitUseCase {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<SplitOutcome> {
        let cfg = &self.config;

        // ── Steps 1-3: table → catalog → assignment ───────────────────────────
        let cohort = prepare_cohort(&cfg.cohort)?;

        // ── Step 4: composition report ────────────────────────────────────────
        let report = composition::compute(cohort.catalog(), cohort.assignment());
        composition::log(&report);

        // ── Step 5: persist ───────────────────────────────────────────────────
        let store       = SplitStore::new(&cfg.out_dir)?;
        let assignment  = store.save_assignment(cohort.assignment())?;
        let subject_map = store.save_subject_folds(cohort.catalog(), cohort.assignment())?;
        let composition = composition::write_csv(store.dir(), &report)?;
        store.save_config(&cfg.cohort)?;

        tracing::info!("Split written to '{}'", cfg.out_dir);
        Ok(SplitOutcome {
            subjects:   cohort.catalog().len(),
            fold_sizes: cohort.assignment().fold_sizes().to_vec(),
            assignment,
            subject_map,
            composition,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// 20 subjects: 2 sexes × 2 labels × 5 ages, written as CSV
    pub(crate) fn write_cohort_csv(dir: &Path) -> String {
        let mut csv = String::from("Subject,PTGENDER,AGE,Group\n");
        for sex in ["Female", "Male"] {
            for label in ["CN", "AD"] {
                for age in [60, 65, 70, 75, 80] {
                    csv.push_str(&format!("{sex}-{label}-{age},{sex},{age},{label}\n"));
                }
            }
        }
        let path = dir.join("metadata.csv");
        fs::write(&path, csv).unwrap();
        path.to_string_lossy().into_owned()
    }

    pub(crate) fn cohort_config(dir: &Path) -> CohortConfig {
        CohortConfig {
            metadata_path: write_cohort_csv(dir),
            catalog:       CatalogConfig { features_set: 0, ..CatalogConfig::default() },
            ..CohortConfig::default()
        }
    }

    #[test]
    fn test_split_writes_artifacts() {
        let dir = tempdir().unwrap();
        let cfg = SplitConfig {
            cohort:  cohort_config(dir.path()),
            out_dir: dir.path().join("out").to_string_lossy().into_owned(),
        };

        let outcome = SplitUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(outcome.subjects, 20);
        assert_eq!(outcome.fold_sizes, vec![4; 5]);
        assert!(outcome.assignment.exists());
        assert!(outcome.composition.exists());

        let subject_map = fs::read_to_string(&outcome.subject_map).unwrap();
        assert_eq!(subject_map.lines().count(), 21);

        let store = SplitStore::new(&cfg.out_dir).unwrap();
        assert_eq!(store.load_config().unwrap(), cfg.cohort);
    }

    #[test]
    fn test_split_is_reproducible() {
        let dir = tempdir().unwrap();
        let cfg = cohort_config(dir.path());
        let a = prepare_cohort(&cfg).unwrap();
        let b = prepare_cohort(&cfg).unwrap();
        assert_eq!(a.assignment(), b.assignment());
    }

    #[test]
    fn test_missing_table_is_reported() {
        let cfg = CohortConfig {
            metadata_path: "/nonexistent/metadata.csv".into(),
            ..CohortConfig::default()
        };
        let err = prepare_cohort(&cfg).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/metadata.csv"));
    }
}
