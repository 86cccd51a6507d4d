// ============================================================
// Layer 6 — Fold Composition Report
// ============================================================
// Summarises what ended up in each fold so a split can be
// checked by eye: size, sex counts, label counts, mean age.
//
// Output file: <out_dir>/fold_composition.csv
//
// Example CSV output:
//   fold,size,female,male,mean_age,labels
//   0,162,79,83,73.412346,AD=34;CN=61;MCI=67
//   1,162,80,82,73.158025,AD=34;CN=61;MCI=67
//   ...
//
// A well-stratified split has fold sizes within one subject of
// each other and label/sex counts that barely move across folds.
//
// Why a single spread number?
//   Different seeds stratify equally well on paper but still move
//   label proportions by a subject here and there. `label_spread`
//   condenses a report into one score (lower is better) so that
//   seeds can be ranked against each other.

use anyhow::Result;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use crate::data::catalog::MetadataCatalog;
use crate::domain::fold::{FoldAssignment, NUM_FOLDS, TEST_FOLD};
use crate::domain::subject::Sex;

const COMPOSITION_FILE: &str = "fold_composition.csv";

/// One row of the composition report
#[derive(Debug, Clone, PartialEq)]
pub struct FoldComposition {
    /// Fold id, 0..NUM_FOLDS
    pub fold: usize,

    /// Number of subjects in the fold
    pub size: usize,

    pub female: usize,
    pub male:   usize,

    /// Mean raw age; 0.0 for an empty fold
    pub mean_age: f64,

    /// Raw label → count
    pub labels: BTreeMap<String, usize>,
}

impl FoldComposition {
    /// `AD=34;CN=61;MCI=67`
    pub fn labels_cell(&self) -> String {
        self.labels
            .iter()
            .map(|(label, n)| format!("{label}={n}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Per-fold composition of `assignment` over `catalog`
pub fn compute(catalog: &MetadataCatalog, assignment: &FoldAssignment) -> Vec<FoldComposition> {
    (0..NUM_FOLDS)
        .map(|fold| {
            let mut c = FoldComposition {
                fold,
                size:     0,
                female:   0,
                male:     0,
                mean_age: 0.0,
                labels:   BTreeMap::new(),
            };
            let mut age_sum = 0.0;

            for &row in assignment.members(fold) {
                let Some(record) = catalog.record(row) else { continue };
                c.size += 1;
                match record.sex {
                    Sex::Female => c.female += 1,
                    Sex::Male   => c.male   += 1,
                }
                age_sum += record.age;
                *c.labels.entry(record.label.clone()).or_insert(0) += 1;
            }

            if c.size > 0 {
                c.mean_age = age_sum / c.size as f64;
            }
            c
        })
        .collect()
}

/// Mean over labels of the standard deviation, across non-empty
/// folds, of that label's share of the fold. 0.0 means every fold
/// has identical label proportions.
pub fn label_spread(report: &[FoldComposition]) -> f64 {
    let folds: Vec<&FoldComposition> = report.iter().filter(|c| c.size > 0).collect();
    let labels: BTreeSet<&str> = folds
        .iter()
        .flat_map(|c| c.labels.keys().map(String::as_str))
        .collect();
    if folds.is_empty() || labels.is_empty() {
        return 0.0;
    }

    let n = folds.len() as f64;
    let total: f64 = labels
        .iter()
        .map(|label| {
            let shares: Vec<f64> = folds
                .iter()
                .map(|c| c.labels.get(*label).copied().unwrap_or(0) as f64 / c.size as f64)
                .collect();
            let mean = shares.iter().sum::<f64>() / n;
            let var  = shares.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            var.sqrt()
        })
        .sum();
    total / labels.len() as f64
}

/// Print the report through tracing
pub fn log(report: &[FoldComposition]) {
    for c in report {
        let role = if c.fold == TEST_FOLD { " (test)" } else { "" };
        tracing::info!(
            "Fold {}{}: {} subjects | F={} M={} | mean age {:.1} | {}",
            c.fold,
            role,
            c.size,
            c.female,
            c.male,
            c.mean_age,
            c.labels_cell(),
        );
    }
}

/// Write the report as `fold_composition.csv` under `dir`
pub fn write_csv(dir: &Path, report: &[FoldComposition]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path  = dir.join(COMPOSITION_FILE);
    let mut w = csv::Writer::from_path(&path)?;

    w.write_record(["fold", "size", "female", "male", "mean_age", "labels"])?;
    for c in report {
        w.write_record([
            c.fold.to_string(),
            c.size.to_string(),
            c.female.to_string(),
            c.male.to_string(),
            format!("{:.6}", c.mean_age),
            c.labels_cell(),
        ])?;
    }
    w.flush()?;

    tracing::debug!("Wrote fold composition to '{}'", path.display());
    Ok(path)
}
