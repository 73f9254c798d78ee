use crate::scoring::DuplicatePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LABNOTE-EVAL: lab-note error scoring
///
/// Reconciles model-extracted protocol step errors against a human benchmark
/// and reports confusion-matrix statistics.
#[derive(Parser, Debug)]
#[command(name = "labnote-eval")]
#[command(version = "0.1.0")]
#[command(about = "Score AI lab-note error annotations against benchmark protocols")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a single benchmark / model output pair
    Score(ScoreArgs),

    /// Average the rubric ratings of one generated protocol
    Rate(RateArgs),

    /// Run an evaluation suite
    Run(RunArgs),

    /// Generate a sample evaluation config file
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct ScoreArgs {
    /// Ground-truth step list (JSON)
    #[arg(short, long)]
    pub benchmark: PathBuf,

    /// Model-extracted step list (JSON)
    #[arg(short, long)]
    pub ai: PathBuf,

    /// Write the merged table and summary to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How to treat repeated step numbers
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Reject)]
    pub duplicate_steps: DuplicatePolicy,

    /// Print only non-zero metrics
    #[arg(long)]
    pub prune: bool,
}

#[derive(Parser, Debug)]
pub struct RateArgs {
    /// Section ratings (JSON)
    #[arg(short, long)]
    pub ratings: PathBuf,

    /// Write the sections and their means to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the evaluation config file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of replicate runs scored concurrently
    #[arg(long, default_value = "1")]
    pub parallelism: u32,

    /// Dry run - list what would be scored
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error when the aggregated metrics miss their thresholds
    #[arg(long)]
    pub enforce_thresholds: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output path for the config file
    #[arg(short, long, default_value = "eval-config.yaml")]
    pub output: PathBuf,
}
