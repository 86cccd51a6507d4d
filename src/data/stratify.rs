// ============================================================
// Layer 4 — Stratified Fold Assigner
// ============================================================
// Partitions the catalog rows into NUM_FOLDS folds so that every
// (sex, label, age-bin) stratum is spread round-robin over the
// folds.
//
// Algorithm:
//   1. Shuffle all row indices with a generator seeded from the
//      caller's seed (one generator per call, never global)
//   2. Bin raw ages into `bins` equal-width bins over the
//      observed range
//   3. Walk strata in nested order: sex (F < M), then label
//      (natural order), then age bin (ascending). Inside a
//      stratum rows keep their shuffled order
//   4. Deal rows to folds 0,1,2,3,4,0,... with ONE counter that
//      is shared by all strata and never reset
//
// Because the nested order keeps every (sex, label) group
// contiguous, each such group ends up with per-fold counts that
// differ by at most one.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

use crate::data::catalog::{LabelKey, MetadataCatalog};
use crate::domain::error::{Error, Result};
use crate::domain::fold::{FoldAssignment, NUM_FOLDS};
use crate::domain::subject::Sex;

/// Number of equal-width age bins used unless configured otherwise
pub const DEFAULT_AGE_BINS: usize = 20;

/// The three attributes a row is stratified on
#[derive(Debug, Clone, PartialEq)]
pub struct StratumRow {
    pub sex: Sex,

    /// Class id for classification, raw label for regression
    pub label: LabelKey,

    /// Raw (unnormalised) age
    pub age: f64,
}

/// Computes a FoldAssignment; holds only its two parameters, so
/// the same assigner can be reused for any number of catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedFoldAssigner {
    /// Seed of the initial row shuffle
    seed: u64,

    /// Number of equal-width age bins
    bins: usize,
}

impl StratifiedFoldAssigner {
    pub fn new(seed: u64) -> Self {
        Self { seed, bins: DEFAULT_AGE_BINS }
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Assign every catalog row to a fold
    pub fn assign(&self, catalog: &MetadataCatalog) -> Result<FoldAssignment> {
        let rows: Vec<StratumRow> = catalog
            .records()
            .iter()
            .map(|r| StratumRow {
                sex:   r.sex,
                label: catalog.label_key(r),
                age:   r.age,
            })
            .collect();
        self.assign_rows(&rows)
    }

    /// Assign rows given directly by their stratification attributes
    pub fn assign_rows(&self, rows: &[StratumRow]) -> Result<FoldAssignment> {
        if self.bins == 0 {
            return Err(Error::configuration("age_bins", 0, "must be at least 1"));
        }
        if rows.is_empty() {
            return Err(Error::integrity("age", "cannot assign folds over an empty table"));
        }

        // ── Step 1: seeded shuffle ────────────────────────────────────────────
        let mut rng   = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.shuffle(&mut rng);

        // ── Step 2: equal-width age bins ──────────────────────────────────────
        let ages: Vec<f64> = rows.iter().map(|r| r.age).collect();
        let age_bins = equal_width_bins(&ages, self.bins)?;

        // ── Step 3: group rows by stratum, keeping shuffled order ─────────────
        // BTreeMap iterates keys as (sex, label, bin) ascending,
        // which is exactly the nested enumeration order.
        let mut strata: BTreeMap<(Sex, &LabelKey, usize), Vec<usize>> = BTreeMap::new();
        for &row in &order {
            let r = &rows[row];
            strata.entry((r.sex, &r.label, age_bins[row])).or_default().push(row);
        }

        // ── Step 4: deal to folds with a shared counter ───────────────────────
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); NUM_FOLDS];
        let mut next = 0usize;
        for ((sex, label, bin), stratum) in &strata {
            tracing::trace!(
                "Stratum ({}, {:?}, bin {}): {} rows starting at fold {}",
                sex, label, bin, stratum.len(), next
            );
            for &row in stratum {
                members[next].push(row);
                next = (next + 1) % NUM_FOLDS;
            }
        }

        let assignment = FoldAssignment::from_members(rows.len(), members, self.seed, self.bins)?;
        tracing::debug!(
            "Assigned {} rows over {} strata (seed {}, {} age bins): fold sizes {:?}",
            rows.len(),
            strata.len(),
            self.seed,
            self.bins,
            assignment.fold_sizes()
        );
        Ok(assignment)
    }
}

/// `n` evenly spaced points from `start` to `stop`, with the
/// last point pinned to `stop` exactly.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / (n - 1) as f64;
    let mut v: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
    if let Some(last) = v.last_mut() {
        *last = stop;
    }
    v
}

/// Bin index of every value under equal-width binning.
///
/// Edges span the observed range in `bins` equal steps; bins are
/// right-closed `(a, b]` and the lowest edge is pulled down by
/// 0.1% of the range so the minimum lands in bin 0. When all
/// values are equal the range is widened by 0.1% of the value
/// (0.001 if the value is zero) on both sides.
pub fn equal_width_bins(values: &[f64], bins: usize) -> Result<Vec<usize>> {
    if bins == 0 {
        return Err(Error::configuration("age_bins", 0, "must be at least 1"));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::integrity("age", format!("age {bad} is not finite")));
    }
    let Some(&first) = values.first() else {
        return Ok(Vec::new());
    };

    let (mn, mx) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let edges = if mn == mx {
        let adj = if mn != 0.0 { 0.001 * mn.abs() } else { 0.001 };
        linspace(mn - adj, mx + adj, bins + 1)
    } else {
        let mut e = linspace(mn, mx, bins + 1);
        e[0] -= (mx - mn) * 0.001;
        e
    };

    Ok(values
        .iter()
        .map(|&v| edges.partition_point(|&e| e < v).saturating_sub(1).min(bins - 1))
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fold::TEST_FOLD;
    use rand::Rng;
    use std::collections::{HashMap, HashSet};

    fn row(sex: Sex, label: u32, age: f64) -> StratumRow {
        StratumRow { sex, label: LabelKey::Class(label), age }
    }

    /// 2 sexes × 2 labels × 5 ages, one subject per combination
    fn grid20() -> Vec<StratumRow> {
        let mut rows = Vec::new();
        for sex in [Sex::Female, Sex::Male] {
            for label in 0..2 {
                for age in [60.0, 65.0, 70.0, 75.0, 80.0] {
                    rows.push(row(sex, label, age));
                }
            }
        }
        rows
    }

    fn random_cohort(n: usize, seed: u64) -> Vec<StratumRow> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                // the first six rows cover every (label, sex) pair
                let (sex, label) = if i < 6 {
                    (if i < 3 { Sex::Female } else { Sex::Male }, (i % 3) as u32)
                } else {
                    (if rng.gen_bool(0.45) { Sex::Female } else { Sex::Male }, rng.gen_range(0..3))
                };
                row(sex, label, rng.gen_range(55.0..92.0))
            })
            .collect()
    }

    #[test]
    fn test_grid_gives_four_per_fold() {
        let a = StratifiedFoldAssigner::new(0).assign_rows(&grid20()).unwrap();
        assert_eq!(a.fold_sizes(), [4, 4, 4, 4, 4]);
    }

    #[test]
    fn test_assignment_is_total_and_covers_all_folds() {
        let rows = random_cohort(137, 11);
        let a = StratifiedFoldAssigner::new(2341).assign_rows(&rows).unwrap();
        assert_eq!(a.len(), rows.len());
        let folds: HashSet<usize> = (0..rows.len()).map(|r| a.fold_of(r).unwrap()).collect();
        assert_eq!(folds, (0..NUM_FOLDS).collect());
    }

    #[test]
    fn test_label_sex_strata_are_balanced() {
        for seed in [0, 1, 7, 2341] {
            let rows = random_cohort(211, seed + 100);
            let a = StratifiedFoldAssigner::new(seed).assign_rows(&rows).unwrap();

            let mut counts: HashMap<(Sex, LabelKey), [usize; NUM_FOLDS]> = HashMap::new();
            for (i, r) in rows.iter().enumerate() {
                counts.entry((r.sex, r.label.clone())).or_default()[a.fold_of(i).unwrap()] += 1;
            }
            for (key, per_fold) in counts {
                let max = per_fold.iter().max().unwrap();
                let min = per_fold.iter().min().unwrap();
                assert!(max - min <= 1, "stratum {key:?} unbalanced: {per_fold:?}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_mapping() {
        let rows = random_cohort(90, 3);
        let a = StratifiedFoldAssigner::new(42).assign_rows(&rows).unwrap();
        let b = StratifiedFoldAssigner::new(42).assign_rows(&rows).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_membership_not_balance() {
        let rows = random_cohort(90, 3);
        let a = StratifiedFoldAssigner::new(1).assign_rows(&rows).unwrap();
        let b = StratifiedFoldAssigner::new(2).assign_rows(&rows).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
        assert_eq!(a.fold_sizes(), b.fold_sizes());
    }

    #[test]
    fn test_shared_counter_spans_singleton_strata() {
        // three singleton strata: folds 0, 1, 2 in enumeration order
        let rows = vec![
            row(Sex::Male,   0, 70.0),
            row(Sex::Female, 1, 70.0),
            row(Sex::Female, 0, 70.0),
        ];
        let a = StratifiedFoldAssigner::new(5).assign_rows(&rows).unwrap();
        assert_eq!(a.fold_of(2), Some(0)); // (F, 0)
        assert_eq!(a.fold_of(1), Some(1)); // (F, 1)
        assert_eq!(a.fold_of(0), Some(2)); // (M, 0)
        assert!(a.members(TEST_FOLD).is_empty());
    }

    #[test]
    fn test_zero_bins_is_configuration_error() {
        let err = StratifiedFoldAssigner::new(0).with_bins(0).assign_rows(&grid20()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_empty_rows_rejected() {
        assert!(StratifiedFoldAssigner::new(0).assign_rows(&[]).is_err());
    }

    #[test]
    fn test_equal_width_bins_edges() {
        let bins = equal_width_bins(&[0.0, 10.0, 5.0, 4.9, 5.1], 2).unwrap();
        // edges ≈ [-0.01, 5, 10], right-closed
        assert_eq!(bins, vec![0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_equal_width_not_quantile() {
        // skewed ages: most mass low, one outlier high
        let ages = [60.0, 60.5, 61.0, 61.5, 62.0, 100.0];
        let bins = equal_width_bins(&ages, 4).unwrap();
        assert_eq!(bins, vec![0, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn test_constant_ages_share_a_bin() {
        let bins = equal_width_bins(&[72.0, 72.0, 72.0], 20).unwrap();
        assert!(bins.iter().all(|&b| b == bins[0]));
        assert!(bins[0] < 20);
    }

    #[test]
    fn test_non_finite_age_rejected() {
        assert!(equal_width_bins(&[60.0, f64::INFINITY], 5).is_err());
    }
}
