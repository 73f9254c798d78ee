mod args;
mod config;

pub use args::{Args, Command, InitArgs, RateArgs, RunArgs, ScoreArgs};
pub use config::{EvalConfig, MetricThresholds, RatingRun, ReplicateRun, TitleCaseConfig};

#[cfg(test)]
pub use config::{CaseConfig, RatingCaseConfig};
