// ============================================================
// Layer 6 — Split Store
// ============================================================
// Persists a computed split so later runs (and other tools) can
// reuse the exact partition.
//
// Files written to the output directory:
//   fold_assignment.json  ← per-fold member rows + seed + bins
//   subject_folds.csv     ← subject id → fold, one row each
//   split_config.json     ← the CohortConfig that produced it
//
// Loading an assignment re-validates it as a strict partition.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::split_use_case::CohortConfig;
use crate::data::catalog::MetadataCatalog;
use crate::domain::fold::{FoldAssignment, NUM_FOLDS};

const ASSIGNMENT_FILE: &str = "fold_assignment.json";
const SUBJECT_FOLDS_FILE: &str = "subject_folds.csv";
const CONFIG_FILE: &str = "split_config.json";

/// On-disk form of a FoldAssignment
#[derive(Debug, Serialize, Deserialize)]
struct StoredAssignment {
    n_rows:  usize,
    seed:    u64,
    bins:    usize,
    members: Vec<Vec<usize>>,
}

pub struct SplitStore {
    dir: PathBuf,
}

impl SplitStore {
    /// Open a store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create split directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn save_assignment(&self, assignment: &FoldAssignment) -> Result<PathBuf> {
        let stored = StoredAssignment {
            n_rows:  assignment.len(),
            seed:    assignment.seed(),
            bins:    assignment.bins(),
            members: (0..NUM_FOLDS).map(|f| assignment.members(f).to_vec()).collect(),
        };
        let path = self.dir.join(ASSIGNMENT_FILE);
        fs::write(&path, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved fold assignment to '{}'", path.display());
        Ok(path)
    }

    pub fn load_assignment(&self) -> Result<FoldAssignment> {
        let path = self.dir.join(ASSIGNMENT_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Have you run 'split' for this directory?",
                path.display()
            )
        })?;
        let stored: StoredAssignment = serde_json::from_str(&json)?;

        let assignment =
            FoldAssignment::from_members(stored.n_rows, stored.members, stored.seed, stored.bins)
                .with_context(|| format!("'{}' is not a valid fold partition", path.display()))?;
        Ok(assignment)
    }

    /// Write one `subject,fold` row per catalog subject
    pub fn save_subject_folds(
        &self,
        catalog:    &MetadataCatalog,
        assignment: &FoldAssignment,
    ) -> Result<PathBuf> {
        let path = self.dir.join(SUBJECT_FOLDS_FILE);
        let mut w = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        w.write_record(["subject", "fold"])?;
        for (row, record) in catalog.records().iter().enumerate() {
            let fold = assignment
                .fold_of(row)
                .with_context(|| format!("row {row} has no fold"))?;
            w.write_record([record.subject_id.as_str(), fold.to_string().as_str()])?;
        }
        w.flush()?;

        tracing::debug!("Saved subject folds to '{}'", path.display());
        Ok(path)
    }

    pub fn save_config(&self, cfg: &CohortConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved split config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<CohortConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn assignment() -> FoldAssignment {
        let members = vec![vec![4, 0], vec![1], vec![5], vec![2], vec![3]];
        FoldAssignment::from_members(6, members, 2341, 20).unwrap()
    }

    #[test]
    fn test_assignment_survives_store() {
        let dir   = tempdir().unwrap();
        let store = SplitStore::new(dir.path().join("split")).unwrap();

        store.save_assignment(&assignment()).unwrap();
        let loaded = store.load_assignment().unwrap();
        assert_eq!(loaded, assignment());
        assert_eq!(loaded.members(0), &[4, 0]);
    }

    #[test]
    fn test_corrupt_partition_rejected() {
        let dir   = tempdir().unwrap();
        let store = SplitStore::new(dir.path()).unwrap();
        fs::write(
            dir.path().join(ASSIGNMENT_FILE),
            r#"{"n_rows":2,"seed":0,"bins":20,"members":[[0,1],[1],[],[],[]]}"#,
        )
        .unwrap();
        assert!(store.load_assignment().is_err());
    }

    #[test]
    fn test_missing_assignment_mentions_split() {
        let dir   = tempdir().unwrap();
        let store = SplitStore::new(dir.path()).unwrap();
        let err   = store.load_assignment().unwrap_err();
        assert!(format!("{err:#}").contains("split"));
    }

    #[test]
    fn test_config_survives_store() {
        let dir   = tempdir().unwrap();
        let store = SplitStore::new(dir.path()).unwrap();
        let cfg   = CohortConfig::default();
        store.save_config(&cfg).unwrap();
        assert_eq!(store.load_config().unwrap(), cfg);
    }
}
