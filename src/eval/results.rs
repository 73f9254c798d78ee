use super::aggregate::{AggregateRow, SkillRecognition, SkillTotal, ThresholdVerdict};
use super::ratings::{RatingSummary, SectionRating};
use super::titles::TitleEvaluation;
use crate::cli::{MetricThresholds, RatingRun, ReplicateRun};
use crate::scoring::CaseScore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Result of scoring one replicate of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseRunResult {
    /// Unique identifier for this run
    pub run_id: String,
    /// Case ID
    pub case_id: String,
    /// Position of the case in the config
    #[serde(skip)]
    pub case_index: usize,
    /// Replicate number, starting at 1
    pub replicate: u32,
    /// Model output that was scored
    pub ai_output: PathBuf,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Status of the run
    pub status: RunStatus,
    /// Merged step table and summary if completed
    pub score: Option<CaseScore>,
    /// Error message if failed
    pub error: Option<String>,
}

impl CaseRunResult {
    pub fn new(run_id: &str, run: &ReplicateRun) -> Self {
        Self {
            run_id: run_id.to_string(),
            case_id: run.case_id.clone(),
            case_index: run.case_index,
            replicate: run.replicate,
            ai_output: run.ai_output.clone(),
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Pending,
            score: None,
            error: None,
        }
    }

    pub fn complete_with_score(&mut self, score: CaseScore) {
        self.completed_at = Some(Utc::now());
        self.score = Some(score);
        self.status = RunStatus::Completed;
    }

    pub fn fail_with_error(&mut self, error: &str) {
        self.completed_at = Some(Utc::now());
        self.error = Some(error.to_string());
        self.status = RunStatus::Failed;
    }
}

/// Rubric ratings of one replicate of one generated protocol
#[derive(Debug, Clone, Serialize)]
pub struct RatingRunResult {
    pub case_id: String,
    #[serde(skip)]
    pub case_index: usize,
    pub replicate: u32,
    pub path: PathBuf,
    pub status: RunStatus,
    pub sections: Vec<SectionRating>,
    pub summary: Option<RatingSummary>,
    pub error: Option<String>,
}

impl RatingRunResult {
    pub fn new(run: &RatingRun) -> Self {
        Self {
            case_id: run.case_id.clone(),
            case_index: run.case_index,
            replicate: run.replicate,
            path: run.path.clone(),
            status: RunStatus::Pending,
            sections: Vec::new(),
            summary: None,
            error: None,
        }
    }

    pub fn complete_with_sections(&mut self, sections: Vec<SectionRating>, summary: RatingSummary) {
        self.sections = sections;
        self.summary = Some(summary);
        self.status = RunStatus::Completed;
    }

    pub fn fail_with_error(&mut self, error: &str) {
        self.error = Some(error.to_string());
        self.status = RunStatus::Failed;
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResults {
    /// Evaluation name
    pub name: String,
    /// Unique evaluation ID
    pub eval_id: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Individual run results
    pub runs: Vec<CaseRunResult>,
    /// Summary row across completed runs
    pub aggregate: Option<AggregateRow>,
    pub skill_recognition: Vec<SkillRecognition>,
    pub skill_totals: Vec<SkillTotal>,
    /// Aggregated metrics checked against the configured thresholds
    pub verdict: Option<ThresholdVerdict>,
    /// ROUGE-1 title scoring, when the config has title cases
    pub titles: Option<TitleEvaluation>,
    /// Rubric ratings of generated protocols
    pub ratings: Vec<RatingRunResult>,
    /// Mean ratings across completed rating runs
    pub rating_summary: Option<RatingSummary>,
    /// Summary statistics
    pub summary: EvalSummary,
}

/// Summary statistics for the evaluation
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalSummary {
    /// Total number of replicate runs
    pub total_runs: u32,
    /// Completed runs
    pub completed: u32,
    /// Failed runs
    pub failed: u32,
    /// Unknown rows across completed runs
    pub unknown_steps: u32,
}

impl EvaluationResults {
    pub fn new(name: &str, eval_id: &str) -> Self {
        Self {
            name: name.to_string(),
            eval_id: eval_id.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            runs: Vec::new(),
            aggregate: None,
            skill_recognition: Vec::new(),
            skill_totals: Vec::new(),
            verdict: None,
            titles: None,
            ratings: Vec::new(),
            rating_summary: None,
            summary: EvalSummary::default(),
        }
    }

    /// Add a run result
    pub fn add_run(&mut self, result: CaseRunResult) {
        self.runs.push(result);
    }

    pub fn add_rating(&mut self, result: RatingRunResult) {
        self.ratings.push(result);
    }

    /// Completed runs for one case
    pub fn case_runs<'a>(&'a self, case_id: &'a str) -> impl Iterator<Item = &'a CaseRunResult> {
        self.runs.iter().filter(move |r| r.case_id == case_id)
    }

    /// Distinct case IDs in run order
    pub fn case_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for run in &self.runs {
            if !ids.contains(&run.case_id.as_str()) {
                ids.push(&run.case_id);
            }
        }
        ids
    }

    /// Aggregate completed runs and check thresholds
    pub fn calculate_scores(&mut self, thresholds: &MetricThresholds) {
        let completed: Vec<(u32, &crate::scoring::ErrorSummary)> = self
            .runs
            .iter()
            .filter_map(|r| r.score.as_ref().map(|s| (r.replicate, &s.summary)))
            .collect();

        self.summary = EvalSummary {
            total_runs: self.runs.len() as u32,
            completed: completed.len() as u32,
            failed: self
                .runs
                .iter()
                .filter(|r| r.status == RunStatus::Failed)
                .count() as u32,
            unknown_steps: completed.iter().map(|(_, s)| s.counts.unknown_steps).sum(),
        };

        let aggregate = AggregateRow::from_summaries(&completed);
        self.skill_recognition = aggregate
            .as_ref()
            .map(AggregateRow::skill_recognition)
            .unwrap_or_default();
        self.skill_totals = aggregate
            .as_ref()
            .map(AggregateRow::skill_totals)
            .unwrap_or_default();
        self.verdict = aggregate.as_ref().map(|row| row.verdict(thresholds));
        self.aggregate = aggregate;

        let rated: Vec<&RatingSummary> =
            self.ratings.iter().filter_map(|r| r.summary.as_ref()).collect();
        self.rating_summary = RatingSummary::mean(&rated);
    }

    /// Finalize the results
    pub fn finalize(&mut self, thresholds: &MetricThresholds) {
        self.completed_at = Some(Utc::now());
        self.runs.sort_by_key(|r| (r.case_index, r.replicate));
        self.ratings.sort_by_key(|r| (r.case_index, r.replicate));
        self.calculate_scores(thresholds);
    }

    /// Save results to a JSON file
    pub fn save_json(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate a human-readable report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("# Evaluation Report: {}\n\n", self.name));
        report.push_str(&format!("Evaluation ID: {}\n", self.eval_id));
        report.push_str(&format!("Started: {}\n", self.started_at));
        if let Some(completed) = self.completed_at {
            report.push_str(&format!("Completed: {}\n", completed));
        }
        report.push('\n');

        report.push_str("## Summary\n\n");
        report.push_str(&format!("- Total Runs: {}\n", self.summary.total_runs));
        report.push_str(&format!("- Completed: {}\n", self.summary.completed));
        report.push_str(&format!("- Failed: {}\n", self.summary.failed));
        report.push_str(&format!("- Unknown Steps: {}\n", self.summary.unknown_steps));

        if let Some(ref aggregate) = self.aggregate {
            report.push_str(&format!("- Replicates: {}\n", aggregate.num_replicates));
            for metric in ["accuracy", "precision", "recall", "f1_score", "classification_accuracy"] {
                report.push_str(&format!(
                    "- {}: {:.3}\n",
                    metric,
                    aggregate.get(metric).unwrap_or(0.0)
                ));
            }
        }
        report.push('\n');

        if let Some(ref verdict) = self.verdict {
            report.push_str("## Thresholds\n\n");
            if verdict.passed {
                report.push_str("All thresholds met.\n");
            }
            for failure in &verdict.failures {
                report.push_str(&format!(
                    "- {} {:.3} is below the minimum of {:.3}\n",
                    failure.metric, failure.value, failure.minimum
                ));
            }
            report.push('\n');
        }

        report.push_str("## Case Results\n\n");
        report.push_str("| Case | Replicate | TP | TN | FP | FN | Added | Unknown | Accuracy | F1 |\n");
        report.push_str("|------|-----------|----|----|----|----|-------|---------|----------|----|\n");

        for run in &self.runs {
            match run.score {
                Some(ref score) => {
                    let c = &score.summary.counts;
                    let r = &score.summary.rates;
                    report.push_str(&format!(
                        "| {} | {} | {} | {} | {} | {} | {} | {} | {:.3} | {:.3} |\n",
                        run.case_id,
                        run.replicate,
                        c.true_positives,
                        c.true_negatives,
                        c.false_positives,
                        c.false_negatives,
                        c.addition_by_model,
                        c.unknown_steps,
                        r.accuracy,
                        r.f1_score
                    ));
                }
                None => {
                    report.push_str(&format!(
                        "| {} | {} | failed: {} |||||||\n",
                        run.case_id,
                        run.replicate,
                        run.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }

        if !self.skill_recognition.is_empty() {
            report.push_str("\n## Error Recognition by Skill\n\n");
            for entry in &self.skill_recognition {
                report.push_str(&format!("### {} ({} total)\n", entry.name, entry.total));
                for split in &entry.skills {
                    report.push_str(&format!(
                        "- {}: {} recognized, {} unrecognized\n",
                        split.skill, split.recognized, split.unrecognized
                    ));
                }
                report.push('\n');
            }
        }

        if !self.ratings.is_empty() {
            report.push_str("## Protocol Ratings\n\n");
            report.push_str("| Protocol | Replicate | Completeness | Technical Accuracy | Logical Flow | Safety | Formatting | Overall |\n");
            report.push_str("|----------|-----------|--------------|--------------------|--------------|--------|------------|---------|\n");
            let rows = self
                .ratings
                .iter()
                .map(|r| (r.case_id.clone(), r.replicate.to_string(), r.summary, r.error.as_deref()))
                .chain(
                    self.rating_summary
                        .map(|s| ("Summary".to_string(), "All".to_string(), Some(s), None)),
                );
            for (case_id, replicate, summary, error) in rows {
                match summary {
                    Some(summary) => {
                        let cells: Vec<String> =
                            summary.named().iter().map(|(_, v)| format!("{:.2}", v)).collect();
                        report.push_str(&format!(
                            "| {} | {} | {} |\n",
                            case_id,
                            replicate,
                            cells.join(" | ")
                        ));
                    }
                    None => {
                        report.push_str(&format!(
                            "| {} | {} | failed: {} |||||\n",
                            case_id,
                            replicate,
                            error.unwrap_or("unknown error")
                        ));
                    }
                }
            }
            report.push('\n');
        }

        if let Some(ref titles) = self.titles {
            report.push_str("## Protocol Titles\n\n");
            report.push_str(&format!(
                "Mean ROUGE-1: {:.3} (threshold {:.2}, {})\n\n",
                titles.overall_score,
                titles.threshold,
                if titles.passed { "passed" } else { "failed" }
            ));
            for outcome in &titles.outcomes {
                report.push_str(&format!(
                    "- {}: {:.3}{}\n",
                    outcome.id,
                    outcome.score,
                    if outcome.passed { "" } else { " (below threshold)" }
                ));
            }
        }

        report
    }
}
