// ============================================================
// Layer 2 — LoadUseCase
// ============================================================
// Builds the Burn data loaders for one cross-validation fold and
// runs a single pass over them, reporting what was delivered:
//
//   Step 1: Catalog + fold assignment      (Layer 4 - data)
//           fresh, or read back from a stored split
//   Step 2: Select rows for each role      (Layer 4 - data)
//   Step 3: Build datasets over volumes    (Layer 4 - data)
//   Step 4: Wrap them in DataLoaders       (burn)
//   Step 5: Iterate once, count batches    (burn)
//
// Train loaders are shuffled; valid and test loaders are not.
// A volume that cannot be loaded during the pass fails the run
// with that volume's error, whether or not items were preloaded.

use anyhow::{bail, Context, Result};
use burn::{backend::NdArray, data::dataloader::DataLoaderBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::split_use_case::{build_catalog, prepare_cohort, CohortConfig};
use crate::data::{
    batcher::SubjectBatcher,
    cohort::AssignedCohort,
    dataset::SubjectDataset,
    splitter::{SplitSelector, DEFAULT_TRAIN_SHUFFLE_SEED},
    volume::{DiskVolumeAccessor, VolumeOptions},
};
use crate::domain::fold::Role;
use crate::domain::traits::VolumeSource;
use crate::infra::split_store::SplitStore;

type LoadBackend = NdArray<f32>;

pub const DEFAULT_LOADER_SHUFFLE_SEED: u64 = 2341;

// ─── Load Configuration ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    pub cohort:      CohortConfig,
    pub volume_root: String,
    pub volumes:     VolumeOptions,

    /// Validation fold, 0..=3
    pub fold: usize,

    /// Build the test loader instead of train + valid
    pub test: bool,

    pub batch_size:  usize,
    pub num_workers: usize,

    /// Seed for the order of the train row list
    pub train_shuffle_seed: u64,

    /// Seed for the DataLoader's per-epoch shuffle
    pub loader_shuffle_seed: u64,

    /// Materialize every item before iterating
    pub preload: bool,

    /// Fraction of each role to keep, in (0, 1]
    pub sample: f64,

    /// Reuse the split stored here instead of recomputing it
    pub assignment_dir: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            cohort:              CohortConfig::default(),
            volume_root:         "data/ADNI".to_string(),
            volumes:             VolumeOptions::default(),
            fold:                0,
            test:                false,
            batch_size:          4,
            num_workers:         1,
            train_shuffle_seed:  DEFAULT_TRAIN_SHUFFLE_SEED,
            loader_shuffle_seed: DEFAULT_LOADER_SHUFFLE_SEED,
            preload:             false,
            sample:              1.0,
            assignment_dir:      None,
        }
    }
}

/// What one role's loader delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSummary {
    pub role: Role,

    /// Rows selected for the role
    pub subjects: usize,

    pub batches: usize,

    /// Items the loader delivered; equals `subjects` on success
    pub items: usize,
}

// ─── LoadUseCase ──────────────────────────────────────────────────────────────
pub struct LoadUseCase {
    config: LoadConfig,
}

impl LoadUseCase {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<RoleSummary>> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        // ── Step 1: catalog + assignment ──────────────────────────────────────
        let cohort = self.cohort()?;

        // ── Steps 2-3: datasets ───────────────────────────────────────────────
        let volumes: Arc<dyn VolumeSource> =
            Arc::new(DiskVolumeAccessor::new(&cfg.volume_root, cfg.volumes));
        let selector = SplitSelector::new(cfg.train_shuffle_seed);

        let roles: &[Role] = if cfg.test { &[Role::Test] } else { &[Role::Train, Role::Valid] };

        let mut summaries = Vec::with_capacity(roles.len());
        for &role in roles {
            let mut dataset = cohort
                .dataset(role, cfg.fold, &selector, Arc::clone(&volumes), cfg.sample)
                .with_context(|| format!("Cannot build the {role} dataset for fold {}", cfg.fold))?;

            if cfg.preload {
                dataset
                    .preload()
                    .with_context(|| format!("Cannot preload the {role} dataset"))?;
            }

            // ── Steps 4-5: loader + one pass ──────────────────────────────────
            summaries.push(self.run_loader(role, dataset)?);
        }

        Ok(summaries)
    }

    fn cohort(&self) -> Result<AssignedCohort> {
        let cfg = &self.config;
        let Some(dir) = &cfg.assignment_dir else {
            return prepare_cohort(&cfg.cohort);
        };

        let store  = SplitStore::new(dir)?;
        let stored = store.load_config()?;
        if stored != cfg.cohort {
            bail!(
                "The split in '{}' was made with a different cohort configuration; \
                 re-run 'split' or match its settings",
                dir
            );
        }

        let assignment = store.load_assignment()?;
        let catalog    = build_catalog(&cfg.cohort)?;
        if assignment.len() != catalog.len() {
            bail!(
                "The split in '{}' covers {} subjects but the catalog has {}",
                dir,
                assignment.len(),
                catalog.len()
            );
        }

        tracing::info!("Reusing fold assignment from '{}'", dir);
        Ok(AssignedCohort::with_assignment(catalog, assignment))
    }

    fn run_loader(&self, role: Role, dataset: SubjectDataset) -> Result<RoleSummary> {
        let cfg      = &self.config;
        let subjects = dataset.rows().len();
        let failures = dataset.failures();
        let batcher  = SubjectBatcher::<LoadBackend>::new(Default::default());

        let builder = DataLoaderBuilder::new(batcher)
            .batch_size(cfg.batch_size)
            .num_workers(cfg.num_workers.max(1));
        let builder = match role {
            Role::Train => builder.shuffle(cfg.loader_shuffle_seed),
            _           => builder,
        };
        let loader = builder.build(dataset);

        let mut batches = 0usize;
        let mut items   = 0usize;
        for batch in loader.iter() {
            batches += 1;
            items   += batch.subject_ids.len();
        }

        if let Some(err) = failures.take() {
            return Err(err).with_context(|| {
                format!("The {role} loader for fold {} stopped after {items} of {subjects} subjects", cfg.fold)
            });
        }
        if items != subjects {
            bail!("The {role} loader for fold {} delivered {items} of {subjects} subjects", cfg.fold);
        }
        tracing::info!(
            "Fold {} {}: {} subjects in {} batches",
            cfg.fold,
            role,
            items,
            batches
        );

        Ok(RoleSummary { role, subjects, batches, items })
    }
}
