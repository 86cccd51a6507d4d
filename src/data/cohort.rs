// ============================================================
// Layer 4 — Assigned Cohort
// ============================================================
// A cleaned catalog together with the fold assignment computed
// over it. The assignment is computed once, when the cohort is
// built, and every dataset view for any fold/role reads from it.
//
// Why compute it once?
//   Views for different folds must come from the same partition,
//   otherwise a subject could be validated in one fold and trained
//   on in another. Holding one assignment per cohort makes that
//   impossible by construction.

use std::sync::Arc;

use crate::data::{
    catalog::MetadataCatalog,
    dataset::SubjectDataset,
    splitter::{take_fraction, SplitSelector},
    stratify::StratifiedFoldAssigner,
};
use crate::domain::error::Result;
use crate::domain::fold::{FoldAssignment, Role};
use crate::domain::subject::SubjectRecord;
use crate::domain::traits::VolumeSource;

pub struct AssignedCohort {
    catalog: MetadataCatalog,

    /// Read-only snapshot of the catalog rows shared with every view
    records: Arc<[SubjectRecord]>,

    /// Computed once; every dataset view reads from it
    assignment: FoldAssignment,
}

impl AssignedCohort {
    /// Compute the fold assignment for `catalog`
    pub fn new(catalog: MetadataCatalog, assigner: &StratifiedFoldAssigner) -> Result<Self> {
        let assignment = assigner.assign(&catalog)?;
        Ok(Self::with_assignment(catalog, assignment))
    }

    /// Pair a catalog with an assignment computed earlier
    pub fn with_assignment(catalog: MetadataCatalog, assignment: FoldAssignment) -> Self {
        let records: Arc<[SubjectRecord]> = catalog.records().to_vec().into();
        Self { catalog, records, assignment }
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn assignment(&self) -> &FoldAssignment {
        &self.assignment
    }

    /// Dataset view for one role of the split around `fold`.
    ///
    /// `sample` in (0, 1) keeps only the leading part of the view.
    pub fn dataset(
        &self,
        role:     Role,
        fold:     usize,
        selector: &SplitSelector,
        volumes:  Arc<dyn VolumeSource>,
        sample:   f64,
    ) -> Result<SubjectDataset> {
        let rows = selector.select(role, &self.assignment, fold)?;
        let rows = take_fraction(rows, sample);
        SubjectDataset::new(role, Arc::clone(&self.records), rows, self.catalog.target(), volumes)
    }
}
