// ============================================================
// Layer 3 — Fold Domain Types
// ============================================================
// A fold assignment maps every catalog row (dense 0..N-1 index)
// to exactly one of NUM_FOLDS folds. Fold TEST_FOLD is reserved
// for the test role; folds 0..TEST_FOLD are the selectable
// validation folds.
//
// The assignment keeps two views of the same partition:
//   fold_of  → row → fold id          (lookup)
//   members  → fold → rows, in the order they were assigned
//
// Both are built together in FoldAssignment::from_members, which
// is the only constructor.

use std::{fmt, str::FromStr};

use crate::domain::error::{Error, Result};

/// Number of folds in every assignment
pub const NUM_FOLDS: usize = 5;

/// The fold that always forms the test set
pub const TEST_FOLD: usize = NUM_FOLDS - 1;

// ─── Role ─────────────────────────────────────────────────────────────────────
/// Which part of a split a dataset view exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Folds 0..=3 minus the validation fold
    Train,

    /// The requested fold, 0..=3
    Valid,

    /// Always fold 4
    Test,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Train, Role::Valid, Role::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Train => "train",
            Role::Valid => "valid",
            Role::Test  => "test",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Role::Train),
            "valid" => Ok(Role::Valid),
            "test"  => Ok(Role::Test),
            other   => Err(Error::configuration("role", other, "must be one of train, valid, test")),
        }
    }
}

// ─── FoldAssignment ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    /// Row → fold id
    fold_of: Vec<u8>,

    /// Fold → rows, in the order they were dealt
    members: Vec<Vec<usize>>,

    /// Seed of the shuffle that produced the assignment
    seed: u64,

    /// Age bin count used for stratification
    bins: usize,
}

impl FoldAssignment {
    /// Build from per-fold member lists.
    ///
    /// Fails unless the lists form a strict partition of 0..n_rows:
    /// every row appears exactly once across all folds.
    pub fn from_members(
        n_rows:  usize,
        members: Vec<Vec<usize>>,
        seed:    u64,
        bins:    usize,
    ) -> Result<Self> {
        if members.len() != NUM_FOLDS {
            return Err(Error::integrity(
                "fold",
                format!("expected {} folds, got {}", NUM_FOLDS, members.len()),
            ));
        }

        let mut fold_of: Vec<Option<u8>> = vec![None; n_rows];
        for (fold, rows) in members.iter().enumerate() {
            for &row in rows {
                let slot = fold_of.get_mut(row).ok_or_else(|| {
                    Error::integrity("fold", format!("row {row} is outside 0..{n_rows}"))
                })?;
                if let Some(prev) = slot.replace(fold as u8) {
                    return Err(Error::integrity(
                        "fold",
                        format!("row {row} assigned to both fold {prev} and fold {fold}"),
                    ));
                }
            }
        }

        let fold_of = fold_of
            .into_iter()
            .enumerate()
            .map(|(row, f)| {
                f.ok_or_else(|| Error::integrity("fold", format!("row {row} has no fold")))
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(Self { fold_of, members, seed, bins })
    }

    /// Number of rows the assignment covers
    pub fn len(&self) -> usize {
        self.fold_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fold_of.is_empty()
    }

    /// Fold id of a row
    pub fn fold_of(&self, row: usize) -> Option<usize> {
        self.fold_of.get(row).map(|&f| f as usize)
    }

    /// Rows of one fold, in assignment order
    pub fn members(&self, fold: usize) -> &[usize] {
        self.members.get(fold).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Row → fold for every row, as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.fold_of
    }

    /// Seed of the shuffle that produced this assignment
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Age bin count used for stratification
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Member count per fold
    pub fn fold_sizes(&self) -> [usize; NUM_FOLDS] {
        let mut sizes = [0; NUM_FOLDS];
        for (fold, rows) in self.members.iter().enumerate() {
            sizes[fold] = rows.len();
        }
        sizes
    }
}
