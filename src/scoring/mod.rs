// Scoring module - reconciles a model's step error list against the benchmark
// and reduces the merged table to confusion-matrix statistics

mod identify;
mod merge;
mod prune;
pub mod rouge;
mod summary;

pub use identify::Identification;
pub use merge::{merge_steps, DuplicatePolicy, StepTable};
pub use prune::prune_zeros;
pub use summary::{ErrorSummary, MetricValue, ALL_PREFIX, RECOGNIZED_PREFIX};

use crate::error::ScoringError;
use crate::steps::{parse_ai_document, parse_benchmark_document};
use serde::Serialize;
use serde_json::Value;

/// Everything produced for one (case, replicate) pair
#[derive(Debug, Clone, Serialize)]
pub struct CaseScore {
    pub steps: StepTable,
    pub summary: ErrorSummary,
    /// `summary` with zero-valued metrics removed
    pub filtered: Value,
}

impl CaseScore {
    pub fn from_table(steps: StepTable) -> Self {
        let summary = ErrorSummary::from_table(&steps);
        let filtered = prune_zeros(&Value::Object(summary.to_map()));
        Self {
            steps,
            summary,
            filtered,
        }
    }
}

/// Parse both documents, merge them and summarize the result
pub fn score_documents(
    benchmark: &Value,
    ai: &Value,
    policy: DuplicatePolicy,
) -> Result<CaseScore, ScoringError> {
    let benchmark = parse_benchmark_document(benchmark)?;
    let ai = parse_ai_document(ai)?;
    let table = merge_steps(&benchmark, &ai, policy)?;
    Ok(CaseScore::from_table(table))
}
