// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `split`, `load` and `search-seeds`
// and their flags. Cohort flags are shared through `CohortArgs`.
//
// `--brain-age` switches the presets for the BrainAge healthy
// cohort: age regression, BrainAge column names, and flat .npy
// volumes (unless --layout / --format say otherwise).

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    load_use_case::{LoadConfig, DEFAULT_LOADER_SHUFFLE_SEED},
    seed_search_use_case::SeedSearchConfig,
    split_use_case::{CohortConfig, SplitConfig, DEFAULT_SPLIT_SEED},
};
use crate::data::{
    catalog::{CatalogConfig, ColumnMap, SexColumns},
    splitter::DEFAULT_TRAIN_SHUFFLE_SEED,
    stratify::DEFAULT_AGE_BINS,
    volume::{VolumeFormat, VolumeLayout, VolumeOptions},
};
use crate::domain::subject::Sex;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the stratified 5-fold assignment and write it to disk
    Split(SplitArgs),

    /// Build the data loaders for one fold and run a pass over them
    Load(LoadArgs),

    /// Rank split seeds by how evenly they spread labels over folds
    SearchSeeds(SearchSeedsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SexArg {
    Female,
    Male,
}

impl From<SexArg> for Sex {
    fn from(s: SexArg) -> Self {
        match s {
            SexArg::Female => Sex::Female,
            SexArg::Male   => Sex::Male,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LayoutArg {
    /// <root>/<subject>/brain_scan.<ext> with a brain mask
    SubjectDirectory,
    /// <root>/<subject>.<ext>
    FlatFiles,
}

impl From<LayoutArg> for VolumeLayout {
    fn from(l: LayoutArg) -> Self {
        match l {
            LayoutArg::SubjectDirectory => VolumeLayout::SubjectDirectory,
            LayoutArg::FlatFiles        => VolumeLayout::FlatFiles,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Nifti,
    Npy,
}

impl From<FormatArg> for VolumeFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Nifti => VolumeFormat::Nifti,
            FormatArg::Npy   => VolumeFormat::Npy,
        }
    }
}

// ─── Cohort flags ─────────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct CohortArgs {
    /// Clinical metadata CSV
    #[arg(long, default_value = "data/ADNIMERGE.csv")]
    pub metadata: String,

    /// JSON file replacing the built-in feature sets
    #[arg(long)]
    pub feature_sets: Option<String>,

    /// Feature set selector
    #[arg(long, default_value_t = 5)]
    pub features_set: u32,

    /// Diagnosis classes: 3 (CN/MCI/AD) or 5 (CN/MCI/AD/EMCI/LMCI)
    #[arg(long, default_value_t = 3)]
    pub num_classes: usize,

    /// BrainAge cohort: regress age instead of classifying diagnosis
    #[arg(long)]
    pub brain_age: bool,

    /// Ages are divided by this before use
    #[arg(long, default_value_t = 100.0)]
    pub age_scale: f64,

    /// Keep only one sex
    #[arg(long, value_enum)]
    pub sex: Option<SexArg>,

    /// Keep only ages in [MIN, MAX)
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub age_window: Option<Vec<f64>>,

    /// Seed for the fold assignment shuffle
    #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
    pub split_seed: u64,

    /// Number of equal-width age bins used for stratification
    #[arg(long, default_value_t = DEFAULT_AGE_BINS)]
    pub age_bins: usize,

    /// Override the subject id column
    #[arg(long)]
    pub subject_col: Option<String>,

    /// Override the categorical sex column
    #[arg(long)]
    pub sex_col: Option<String>,

    /// Override the age column
    #[arg(long)]
    pub age_col: Option<String>,

    /// Override the label column
    #[arg(long)]
    pub label_col: Option<String>,
}

impl From<CohortArgs> for CohortConfig {
    fn from(a: CohortArgs) -> Self {
        let mut columns = if a.brain_age { ColumnMap::brain_age() } else { ColumnMap::adni() };
        if let Some(c) = a.subject_col { columns.subject = c; }
        if let Some(c) = a.sex_col     { columns.sex     = SexColumns::Categorical(c); }
        if let Some(c) = a.age_col     { columns.age     = c; }
        if let Some(c) = a.label_col   { columns.label   = c; }

        let age_window = a.age_window.as_deref().and_then(|w| match w {
            [lo, hi] => Some((*lo, *hi)),
            _        => None,
        });

        CohortConfig {
            metadata_path:     a.metadata,
            feature_sets_path: a.feature_sets,
            catalog: CatalogConfig {
                columns,
                features_set: a.features_set,
                num_classes:  if a.brain_age { None } else { Some(a.num_classes) },
                age_scale:    a.age_scale,
                sex_filter:   a.sex.map(Sex::from),
                age_window,
            },
            split_seed: a.split_seed,
            age_bins:   a.age_bins,
        }
    }
}

// ─── split ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SplitArgs {
    #[command(flatten)]
    pub cohort: CohortArgs,

    /// Directory for fold_assignment.json and the reports
    #[arg(long, default_value = "splits")]
    pub out_dir: String,
}

impl From<SplitArgs> for SplitConfig {
    fn from(a: SplitArgs) -> Self {
        SplitConfig {
            cohort:  a.cohort.into(),
            out_dir: a.out_dir,
        }
    }
}

// ─── load ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub cohort: CohortArgs,

    /// Root directory of the subject volumes
    #[arg(long, default_value = "data/ADNI")]
    pub adni_dir: String,

    /// Validation fold (0-3); the rest of 0-3 is train
    #[arg(long, default_value_t = 0)]
    pub fold: usize,

    /// Load the held-out test fold instead of train/valid
    #[arg(long)]
    pub test: bool,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for the order of the train rows
    #[arg(long, default_value_t = DEFAULT_TRAIN_SHUFFLE_SEED)]
    pub train_shuffle_seed: u64,

    /// Seed for the train loader's shuffle
    #[arg(long, default_value_t = DEFAULT_LOADER_SHUFFLE_SEED)]
    pub shuffle_seed: u64,

    /// Read every volume into memory first
    #[arg(long)]
    pub preload: bool,

    /// Fraction of each role to keep
    #[arg(long, default_value_t = 1.0)]
    pub sample: f64,

    /// Reuse the split written by `split` to this directory
    #[arg(long)]
    pub assignment_dir: Option<String>,

    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Use brain_scan_simple instead of the bias-field corrected scan
    #[arg(long)]
    pub no_bias_field_correct: bool,

    /// Skip the brain mask
    #[arg(long)]
    pub with_skull: bool,

    /// Serve placeholder volumes; never touch the volume files
    #[arg(long)]
    pub only_tabular: bool,
}

impl From<LoadArgs> for LoadConfig {
    fn from(a: LoadArgs) -> Self {
        let (layout, format) = if a.cohort.brain_age {
            (VolumeLayout::FlatFiles, VolumeFormat::Npy)
        } else {
            (VolumeLayout::SubjectDirectory, VolumeFormat::Nifti)
        };

        LoadConfig {
            volume_root: a.adni_dir,
            volumes: VolumeOptions {
                layout:               a.layout.map_or(layout, Into::into),
                format:               a.format.map_or(format, Into::into),
                bias_field_corrected: !a.no_bias_field_correct,
                with_skull:           a.with_skull,
                only_tabular:         a.only_tabular,
            },
            fold:                a.fold,
            test:                a.test,
            batch_size:          a.batch_size,
            num_workers:         a.num_workers,
            train_shuffle_seed:  a.train_shuffle_seed,
            loader_shuffle_seed: a.shuffle_seed,
            preload:             a.preload,
            sample:              a.sample,
            assignment_dir:      a.assignment_dir,
            cohort:              a.cohort.into(),
        }
    }
}

// ─── search-seeds ─────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SearchSeedsArgs {
    /// --split-seed is ignored here; seeds come from --from..--to
    #[command(flatten)]
    pub cohort: CohortArgs,

    /// First seed tried
    #[arg(long, default_value_t = 0)]
    pub from: u64,

    /// One past the last seed tried
    #[arg(long, default_value_t = 300)]
    pub to: u64,

    /// How many of the best seeds to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

impl From<SearchSeedsArgs> for SeedSearchConfig {
    fn from(a: SearchSeedsArgs) -> Self {
        SeedSearchConfig {
            cohort: a.cohort.into(),
            from:   a.from,
            to:     a.to,
            top:    a.top,
        }
    }
}
