// ============================================================
// Layer 2 — SeedSearchUseCase
// ============================================================
// Ranks candidate split seeds by how evenly they spread the
// label proportions over the folds:
//
//   Step 1: Read + clean the table once    (Layer 4 - data)
//   Step 2: For every seed in [from, to):
//             assign folds                 (Layer 4 - data)
//             composition → label spread   (Layer 6 - infra)
//   Step 3: Sort by spread, keep the best K
//
// The winning seed is meant to be passed to `split --split-seed`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::application::split_use_case::{build_catalog, CohortConfig};
use crate::data::stratify::StratifiedFoldAssigner;
use crate::domain::fold::NUM_FOLDS;
use crate::infra::composition;

// ─── Search Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSearchConfig {
    /// Everything but the split seed, which is searched
    pub cohort: CohortConfig,

    /// First seed tried
    pub from: u64,

    /// One past the last seed tried
    pub to: u64,

    /// How many of the best seeds to return
    pub top: usize,
}

impl Default for SeedSearchConfig {
    fn default() -> Self {
        Self {
            cohort: CohortConfig::default(),
            from:   0,
            to:     300,
            top:    10,
        }
    }
}

/// Score of one candidate seed
#[derive(Debug, Clone, PartialEq)]
pub struct SeedScore {
    pub seed: u64,

    /// `composition::label_spread` of the resulting folds, lower is better
    pub spread: f64,

    pub fold_sizes: [usize; NUM_FOLDS],
}

// ─── SeedSearchUseCase ────────────────────────────────────────────────────────
pub struct SeedSearchUseCase {
    config: SeedSearchConfig,
}

impl SeedSearchUseCase {
    pub fn new(config: SeedSearchConfig) -> Self {
        Self { config }
    }

    /// The best `top` seeds, best first; ties go to the lower seed
    pub fn execute(&self) -> Result<Vec<SeedScore>> {
        let cfg = &self.config;
        if cfg.from >= cfg.to {
            bail!("empty seed range {}..{}", cfg.from, cfg.to);
        }
        if cfg.top == 0 {
            bail!("top must be at least 1");
        }

        // ── Step 1: catalog, built once ───────────────────────────────────────
        let catalog = build_catalog(&cfg.cohort)?;

        // ── Step 2: score every seed ──────────────────────────────────────────
        tracing::info!("Scoring split seeds {}..{}", cfg.from, cfg.to);
        let mut scores = Vec::with_capacity((cfg.to - cfg.from) as usize);
        for seed in cfg.from..cfg.to {
            let assignment = StratifiedFoldAssigner::new(seed)
                .with_bins(cfg.cohort.age_bins)
                .assign(&catalog)?;
            let report = composition::compute(&catalog, &assignment);
            let spread = composition::label_spread(&report);
            tracing::debug!("Seed {}: label spread {:.5}", seed, spread);

            scores.push(SeedScore { seed, spread, fold_sizes: assignment.fold_sizes() });
        }

        // ── Step 3: rank ──────────────────────────────────────────────────────
        scores.sort_by(|a, b| a.spread.total_cmp(&b.spread).then(a.seed.cmp(&b.seed)));
        scores.truncate(cfg.top);

        if let Some(best) = scores.first() {
            tracing::info!("Best seed {} with label spread {:.5}", best.seed, best.spread);
        }
        Ok(scores)
    }
}
