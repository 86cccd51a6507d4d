// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with `clap` and hands the
// resulting configs to Layer 2 (application).
//
// Three commands are supported:
//   1. `split`        : compute and store the stratified fold assignment
//   2. `load`         : build the data loaders for one fold
//   3. `search-seeds` : rank split seeds by label balance

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, LoadArgs, SearchSeedsArgs, SplitArgs};

#[derive(Parser, Debug)]
#[command(
    name = "cohort-folds",
    version = "0.1.0",
    about = "Stratified 5-fold splits and data loaders for ADNI / BrainAge cohorts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case for the chosen subcommand
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Split(args)       => run_split(args),
            Commands::Load(args)        => run_load(args),
            Commands::SearchSeeds(args) => run_search_seeds(args),
        }
    }
}

fn run_split(args: SplitArgs) -> Result<()> {
    use crate::application::split_use_case::SplitUseCase;

    let outcome = SplitUseCase::new(args.into()).execute()?;

    println!("Split {} subjects into folds {:?}", outcome.subjects, outcome.fold_sizes);
    println!("  assignment:  {}", outcome.assignment.display());
    println!("  subjects:    {}", outcome.subject_map.display());
    println!("  composition: {}", outcome.composition.display());
    Ok(())
}

fn run_load(args: LoadArgs) -> Result<()> {
    use crate::application::load_use_case::LoadUseCase;

    let fold      = args.fold;
    let summaries = LoadUseCase::new(args.into()).execute()?;

    for s in summaries {
        println!(
            "fold {fold} {:<5}: {} of {} subjects in {} batches",
            s.role.as_str(),
            s.items,
            s.subjects,
            s.batches
        );
    }
    Ok(())
}

fn run_search_seeds(args: SearchSeedsArgs) -> Result<()> {
    use crate::application::seed_search_use_case::SeedSearchUseCase;

    let best = SeedSearchUseCase::new(args.into()).execute()?;

    println!("{:>4}  {:>8}  {:>10}  fold sizes", "rank", "seed", "spread");
    for (rank, s) in best.iter().enumerate() {
        println!("{:>4}  {:>8}  {:>10.5}  {:?}", rank + 1, s.seed, s.spread, s.fold_sizes);
    }
    Ok(())
}
