// Evaluation module - runs every replicate of every case and collects results

mod aggregate;
mod export;
mod ratings;
mod results;
mod runner;
mod titles;

pub use results::EvaluationResults;
pub use runner::{load_ratings, read_json, EvalRunner};
pub use titles::TitleScoreAccumulator;
