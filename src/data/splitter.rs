// ============================================================
// Layer 4 — Split Selector
// ============================================================
// Derives the row indices a dataset view exposes from a fold
// assignment, a role, and a requested validation fold:
//
//   test  → rows of fold 4, whatever fold was requested
//   valid → rows of the requested fold
//   train → every other row
//
// Validation and test rows come back in assignment order.
// Training rows are shuffled with the selector's own seeded
// generator; shuffling changes iteration order, never which rows
// are included.
//
// The selector holds no mutable state, so one instance can serve
// any number of dataset views.
//
// Reference: rand crate documentation (SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::{Error, Result};
use crate::domain::fold::{FoldAssignment, Role, TEST_FOLD};

/// Seed of the training-order shuffle unless configured otherwise
pub const DEFAULT_TRAIN_SHUFFLE_SEED: u64 = 0;

/// The three row sets of one split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Every row outside the validation and test folds, shuffled
    pub train: Vec<usize>,

    /// Rows of the requested fold, in assignment order
    pub valid: Vec<usize>,

    /// Rows of fold 4, in assignment order
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn get(&self, role: Role) -> &[usize] {
        match role {
            Role::Train => &self.train,
            Role::Valid => &self.valid,
            Role::Test  => &self.test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSelector {
    /// Seed of the generator that orders the train rows
    shuffle_seed: u64,
}

impl SplitSelector {
    pub fn new(shuffle_seed: u64) -> Self {
        Self { shuffle_seed }
    }

    /// Row indices for `role` when `requested_fold` is the
    /// validation fold.
    ///
    /// Train and valid need `requested_fold` in `0..TEST_FOLD`;
    /// test ignores it.
    pub fn select(
        &self,
        role:           Role,
        assignment:     &FoldAssignment,
        requested_fold: usize,
    ) -> Result<Vec<usize>> {
        match role {
            Role::Test => Ok(assignment.members(TEST_FOLD).to_vec()),
            Role::Valid => {
                check_fold(role, requested_fold)?;
                Ok(assignment.members(requested_fold).to_vec())
            }
            Role::Train => {
                check_fold(role, requested_fold)?;
                let mut train: Vec<usize> = assignment
                    .as_slice()
                    .iter()
                    .enumerate()
                    .filter(|&(_, &f)| f as usize != requested_fold && f as usize != TEST_FOLD)
                    .map(|(row, _)| row)
                    .collect();

                let mut rng = StdRng::seed_from_u64(self.shuffle_seed);
                train.shuffle(&mut rng);
                Ok(train)
            }
        }
    }

    /// All three roles at once
    pub fn select_all(&self, assignment: &FoldAssignment, requested_fold: usize) -> Result<SplitIndices> {
        let split = SplitIndices {
            train: self.select(Role::Train, assignment, requested_fold)?,
            valid: self.select(Role::Valid, assignment, requested_fold)?,
            test:  self.select(Role::Test,  assignment, requested_fold)?,
        };

        tracing::debug!(
            "Fold {} split: {} train, {} valid, {} test",
            requested_fold,
            split.train.len(),
            split.valid.len(),
            split.test.len(),
        );
        Ok(split)
    }
}

impl Default for SplitSelector {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIN_SHUFFLE_SEED)
    }
}

fn check_fold(role: Role, fold: usize) -> Result<()> {
    if fold < TEST_FOLD {
        Ok(())
    } else {
        Err(Error::InvalidFold {
            fold,
            role: role.to_string(),
            max:  TEST_FOLD - 1,
        })
    }
}

/// Keep the leading `fraction` of `indices`, for quick runs on a
/// portion of the data. Fractions outside (0, 1) keep everything.
pub fn take_fraction(mut indices: Vec<usize>, fraction: f64) -> Vec<usize> {
    if fraction > 0.0 && fraction < 1.0 {
        let keep = ((indices.len() as f64) * fraction) as usize;
        indices.truncate(keep);
    }
    indices
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::LabelKey;
    use crate::data::stratify::{StratifiedFoldAssigner, StratumRow};
    use crate::domain::fold::NUM_FOLDS;
    use crate::domain::subject::Sex;
    use std::collections::HashSet;

    fn grid20() -> Vec<StratumRow> {
        let mut rows = Vec::new();
        for sex in [Sex::Female, Sex::Male] {
            for label in ["AD", "CN"] {
                for age in [60.0, 65.0, 70.0, 75.0, 80.0] {
                    rows.push(StratumRow { sex, label: LabelKey::Name(label.into()), age });
                }
            }
        }
        rows
    }

    fn assignment(n: usize) -> FoldAssignment {
        let mut members = vec![Vec::new(); NUM_FOLDS];
        for row in 0..n {
            members[row % NUM_FOLDS].push(row);
        }
        FoldAssignment::from_members(n, members, 0, 20).unwrap()
    }

    #[test]
    fn test_partition_law_for_every_fold() {
        let a = assignment(23);
        let sel = SplitSelector::default();
        for fold in 0..TEST_FOLD {
            let s = sel.select_all(&a, fold).unwrap();
            let train: HashSet<usize> = s.train.iter().copied().collect();
            let valid: HashSet<usize> = s.valid.iter().copied().collect();
            let test:  HashSet<usize> = s.test.iter().copied().collect();

            assert!(train.is_disjoint(&valid));
            assert!(train.is_disjoint(&test));
            assert!(valid.is_disjoint(&test));

            let union: HashSet<usize> = train.union(&valid).chain(test.iter()).copied().collect();
            assert_eq!(union, (0..23).collect());
            assert_eq!(s.train.len() + s.valid.len() + s.test.len(), 23);
        }
    }

    #[test]
    fn test_test_set_ignores_requested_fold() {
        let a = assignment(40);
        let sel = SplitSelector::default();
        let reference = sel.select(Role::Test, &a, 0).unwrap();
        for fold in 0..=9 {
            assert_eq!(sel.select(Role::Test, &a, fold).unwrap(), reference);
        }
        assert_eq!(reference, a.members(TEST_FOLD));
    }

    #[test]
    fn test_valid_fold_four_is_rejected() {
        let a = assignment(10);
        let err = SplitSelector::default().select(Role::Valid, &a, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidFold { fold: 4, max: 3, .. }));
        assert!(err.to_string().contains("0..=3"));
        assert!(SplitSelector::default().select(Role::Train, &a, 7).is_err());
    }

    #[test]
    fn test_train_shuffle_changes_order_only() {
        let a = assignment(200);
        let x = SplitSelector::new(1).select(Role::Train, &a, 2).unwrap();
        let y = SplitSelector::new(2).select(Role::Train, &a, 2).unwrap();
        let z = SplitSelector::new(1).select(Role::Train, &a, 2).unwrap();
        assert_eq!(x, z);
        assert_ne!(x, y);

        let mut xs = x.clone();
        let mut ys = y.clone();
        xs.sort_unstable();
        ys.sort_unstable();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_twenty_subject_scenario() {
        let a = StratifiedFoldAssigner::new(0).assign_rows(&grid20()).unwrap();
        assert_eq!(a.fold_sizes(), [4; NUM_FOLDS]);

        let sel = SplitSelector::default();
        let valid = sel.select(Role::Valid, &a, 0).unwrap();
        assert_eq!(valid.len(), 4);
        assert!(valid.iter().all(|&r| a.fold_of(r) == Some(0)));

        let fold4: Vec<usize> = (0..20).filter(|&r| a.fold_of(r) == Some(TEST_FOLD)).collect();
        for fold in 0..TEST_FOLD {
            let mut test = sel.select(Role::Test, &a, fold).unwrap();
            test.sort_unstable();
            assert_eq!(test, fold4);
        }
    }

    #[test]
    fn test_take_fraction() {
        assert_eq!(take_fraction((0..10).collect(), 0.3), vec![0, 1, 2]);
        assert_eq!(take_fraction((0..4).collect(), 1.0).len(), 4);
        assert_eq!(take_fraction((0..4).collect(), 0.0).len(), 4);
    }
}
