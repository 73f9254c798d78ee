use super::export::{complete_analysis_csv, performance_metrics_csv, protocol_ratings_csv};
use super::ratings::{parse_rating_document, RatingSummary, SectionRating};
use super::results::{CaseRunResult, EvaluationResults, RatingRunResult, RunStatus};
use super::titles::{evaluate_titles, TitleScoreAccumulator};
use crate::cli::{EvalConfig, RatingRun, ReplicateRun};
use crate::scoring::{score_documents, CaseScore, DuplicatePolicy, Identification};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Orchestrates scoring of every replicate in an evaluation config
pub struct EvalRunner {
    config: EvalConfig,
    results: Arc<Mutex<EvaluationResults>>,
}

impl EvalRunner {
    /// Create a new EvalRunner
    pub fn new(config: EvalConfig) -> Self {
        let eval_id = Uuid::new_v4().to_string();
        let results = Arc::new(Mutex::new(EvaluationResults::new(&config.name, &eval_id)));

        Self { config, results }
    }

    /// Run the evaluation.
    ///
    /// Title cases, if any, are folded into `titles` so totals can span several runs.
    pub async fn run(
        &self,
        parallelism: u32,
        titles: &mut TitleScoreAccumulator,
    ) -> Result<EvaluationResults> {
        let eval_id = {
            let results = self.results.lock().await;
            results.eval_id.clone()
        };

        info!(
            "Starting evaluation: {} (ID: {})",
            self.config.name, eval_id
        );

        let replicates = self.config.replicate_runs();
        info!(
            "Scoring {} replicate runs across {} cases with parallelism {}",
            replicates.len(),
            self.config.cases.len(),
            parallelism
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(parallelism.max(1) as usize));
        let mut handles = Vec::new();

        for replicate in replicates {
            let permit = semaphore.clone().acquire_owned().await?;
            let results = Arc::clone(&self.results);
            let policy = self.config.settings.duplicate_steps;
            let unknown_warn_ratio = self.config.settings.unknown_warn_ratio;

            let handle = tokio::spawn(async move {
                let result = run_single_case(&replicate, policy, unknown_warn_ratio).await;

                {
                    let mut results_guard = results.lock().await;
                    results_guard.add_run(result);
                }

                drop(permit);
            });

            handles.push(handle);
        }

        for handle in handles {
            handle.await?;
        }

        let mut final_results = self.results.lock().await;

        for run in self.config.rating_runs() {
            final_results.add_rating(rate_protocol(&run).await);
        }

        if !self.config.title_cases.is_empty() {
            let evaluation = evaluate_titles(
                &self.config.title_cases,
                self.config.settings.title_threshold,
                titles,
            );
            final_results.titles = Some(evaluation);
        }

        final_results.finalize(&self.config.settings.thresholds);

        Ok(final_results.clone())
    }

    /// Save results to the output directory
    pub async fn save_results(&self, output_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .context(format!("Failed to create output directory: {:?}", output_dir))?;

        let results = self.results.lock().await;

        let mut all_sets = serde_json::Map::new();
        for case_id in results.case_ids() {
            let runs = case_runs_json(&results, case_id);
            let path = output_dir.join(format!("eval_set_{}_all_runs.json", case_id));
            tokio::fs::write(&path, serde_json::to_string_pretty(&runs)?).await?;
            info!("Saved case runs to {:?}", path);
            all_sets.insert(case_id.to_string(), runs);
        }

        let all_path = output_dir.join("all_eval_sets_all_runs.json");
        tokio::fs::write(&all_path, serde_json::to_string_pretty(&all_sets)?).await?;

        let json_path = output_dir.join(format!("{}.json", results.eval_id));
        results.save_json(&json_path)?;
        info!("Saved results to {:?}", json_path);

        let performance_path = output_dir.join("performance_metrics.csv");
        tokio::fs::write(&performance_path, performance_metrics_csv(&results)?).await?;
        let analysis_path = output_dir.join("complete_analysis.csv");
        tokio::fs::write(&analysis_path, complete_analysis_csv(&results)?).await?;
        info!("Saved metrics to {:?}", performance_path);

        if !results.ratings.is_empty() {
            let ratings_path = output_dir.join("protocol_ratings.csv");
            tokio::fs::write(&ratings_path, protocol_ratings_csv(&results)?).await?;
            info!("Saved protocol ratings to {:?}", ratings_path);
        }

        let report_path = output_dir.join(format!("{}_report.md", results.eval_id));
        let report = results.generate_report();
        tokio::fs::write(&report_path, report).await?;
        info!("Saved report to {:?}", report_path);

        Ok(())
    }
}

/// Replicate-keyed record of every completed run for one case
fn case_runs_json(results: &EvaluationResults, case_id: &str) -> Value {
    let runs: serde_json::Map<String, Value> = results
        .case_runs(case_id)
        .filter_map(|run| {
            let score = run.score.as_ref()?;
            Some((
                format!("run_{}", run.replicate),
                json!({
                    "ai_output": run.ai_output,
                    "steps": score.steps,
                    "summary": score.summary,
                    "filtered_summary": score.filtered,
                }),
            ))
        })
        .collect();
    Value::Object(runs)
}

/// Score a single replicate run
async fn run_single_case(
    replicate: &ReplicateRun,
    policy: DuplicatePolicy,
    unknown_warn_ratio: f64,
) -> CaseRunResult {
    let run_id = Uuid::new_v4().to_string();

    info!(
        "Starting run {} for case '{}' replicate {}",
        run_id, replicate.case_id, replicate.replicate
    );

    let mut result = CaseRunResult::new(&run_id, replicate);
    result.status = RunStatus::Running;

    match score_replicate(replicate, policy).await {
        Ok(score) => {
            check_unknown_ratio(replicate, &score, unknown_warn_ratio);
            info!(
                "Run {} completed: accuracy {:.3}, f1 {:.3}",
                run_id, score.summary.rates.accuracy, score.summary.rates.f1_score
            );
            result.complete_with_score(score);
        }
        Err(e) => {
            error!(
                "Run {} for case '{}' failed: {:#}",
                run_id, replicate.case_id, e
            );
            result.fail_with_error(&format!("{:#}", e));
        }
    }

    result
}

async fn score_replicate(replicate: &ReplicateRun, policy: DuplicatePolicy) -> Result<CaseScore> {
    let benchmark = read_json(&replicate.benchmark).await?;
    let ai = read_json(&replicate.ai_output).await?;
    let score = score_documents(&benchmark, &ai, policy).context(format!(
        "Failed to score {:?} against {:?}",
        replicate.ai_output, replicate.benchmark
    ))?;
    Ok(score)
}

/// Average the rubric ratings in one rating file
async fn rate_protocol(run: &RatingRun) -> RatingRunResult {
    let mut result = RatingRunResult::new(run);

    match load_ratings(&run.path).await {
        Ok((sections, summary)) => {
            info!(
                "Ratings for '{}' replicate {}: overall {:.2} over {} sections",
                run.case_id,
                run.replicate,
                summary.overall,
                sections.len()
            );
            result.complete_with_sections(sections, summary);
        }
        Err(e) => {
            error!(
                "Ratings for '{}' replicate {} failed: {:#}",
                run.case_id, run.replicate, e
            );
            result.fail_with_error(&format!("{:#}", e));
        }
    }

    result
}

pub async fn load_ratings(path: &Path) -> Result<(Vec<SectionRating>, RatingSummary)> {
    let doc = read_json(path).await?;
    let sections =
        parse_rating_document(&doc).context(format!("Invalid rating document {:?}", path))?;
    let summary = RatingSummary::from_sections(&sections)
        .context(format!("Invalid rating document {:?}", path))?;
    Ok((sections, summary))
}

pub async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).context(format!("Failed to parse JSON in {:?}", path))
}

fn check_unknown_ratio(replicate: &ReplicateRun, score: &CaseScore, max_ratio: f64) {
    if score.steps.is_empty() {
        return;
    }
    let total = score.steps.len();
    let unknown = score.steps.count(Identification::Unknown);
    let ratio = unknown as f64 / total as f64;
    if unknown > 0 && ratio > max_ratio {
        warn!(
            "Case '{}' replicate {}: {} of {} steps could not be identified",
            replicate.case_id, replicate.replicate, unknown, total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CaseConfig, RatingCaseConfig, TitleCaseConfig};
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, value: Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn config(dir: &Path) -> EvalConfig {
        let benchmark = write(
            dir,
            "bench.json",
            json!({"dict_error_classification": [
                {"Step": 1.0, "Benchmark": "No Error", "Class": "N/A", "Skill": "N/A"},
                {"Step": 2.0, "Benchmark": "Error", "Class": "Omitted", "Skill": "Fast"}
            ]}),
        );
        let good = write(
            dir,
            "run1.json",
            json!({"steps": [
                {"step": 1.0, "ai_response": "No Error", "ai_class": "N/A"},
                {"step": 2.0, "ai_response": "Error", "ai_class": "Omitted"}
            ]}),
        );
        let broken = write(dir, "run2.json", json!({"steps": [{"ai_response": "Error"}]}));

        let mut config = EvalConfig::sample();
        config.cases = vec![CaseConfig {
            id: "case_a".to_string(),
            benchmark,
            ai_outputs: vec![good, broken],
        }];
        config.title_cases = vec![TitleCaseConfig {
            id: "t1".to_string(),
            response: "\"Needle wash\"".to_string(),
            expected: "Needle wash".to_string(),
        }];
        config
    }

    #[tokio::test]
    async fn test_run_records_failures_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let runner = EvalRunner::new(config(dir.path()));
        let mut titles = TitleScoreAccumulator::default();

        let results = runner.run(2, &mut titles).await.unwrap();

        assert_eq!(results.summary.total_runs, 2);
        assert_eq!(results.summary.completed, 1);
        assert_eq!(results.summary.failed, 1);
        assert_eq!(results.runs[0].replicate, 1);
        assert!(results.runs[1].error.as_ref().unwrap().contains("step"));
        assert_eq!(titles.total_cases, 1);
        assert!(results.titles.as_ref().unwrap().passed);
    }

    #[tokio::test]
    async fn test_save_results_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = EvalRunner::new(config(dir.path()));
        let mut titles = TitleScoreAccumulator::default();
        let results = runner.run(1, &mut titles).await.unwrap();

        let out = dir.path().join("out");
        runner.save_results(&out).await.unwrap();

        for name in [
            "eval_set_case_a_all_runs.json",
            "all_eval_sets_all_runs.json",
            "performance_metrics.csv",
            "complete_analysis.csv",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        assert!(out.join(format!("{}_report.md", results.eval_id)).exists());

        let case: Value = serde_json::from_str(
            &std::fs::read_to_string(out.join("eval_set_case_a_all_runs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(case["run_1"]["summary"]["true_positives"], json!(1));
        assert_eq!(case["run_1"]["steps"][1]["identification"], json!("Error (Correctly Identified)"));
        assert!(case.get("run_2").is_none());
    }

    #[tokio::test]
    async fn test_protocol_ratings_are_scored_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let section = |value: i64| {
            json!({
                "section": "Procedure - Step 1",
                "completeness_rating": value,
                "technical_accuracy_rating": value,
                "logical_flow_rating": value,
                "safety_rating": value,
                "formatting_rating": value
            })
        };
        let good = write(dir.path(), "rated.json", json!({"sections": [section(5), section(3)]}));
        let out_of_range = write(dir.path(), "bad.json", json!([section(7)]));

        let mut config = config(dir.path());
        config.protocol_ratings = vec![RatingCaseConfig {
            id: "protocol_a".to_string(),
            ratings: vec![good, out_of_range],
        }];
        let runner = EvalRunner::new(config);
        let mut titles = TitleScoreAccumulator::default();
        let results = runner.run(1, &mut titles).await.unwrap();

        assert_eq!(results.ratings.len(), 2);
        assert_eq!(results.ratings[0].summary.unwrap().overall, 4.0);
        assert_eq!(results.ratings[1].status, RunStatus::Failed);
        assert!(results.ratings[1].error.as_ref().unwrap().contains("between 1 and 5"));
        assert_eq!(results.rating_summary.unwrap().completeness, 4.0);

        let out = dir.path().join("out");
        runner.save_results(&out).await.unwrap();
        let csv = std::fs::read_to_string(out.join("protocol_ratings.csv")).unwrap();
        assert!(csv.lines().last().unwrap().starts_with("Summary,All,4,"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_run() {
        let replicate = ReplicateRun {
            case_id: "missing".to_string(),
            case_index: 0,
            replicate: 1,
            benchmark: PathBuf::from("/nonexistent/bench.json"),
            ai_output: PathBuf::from("/nonexistent/run.json"),
        };
        let result = run_single_case(&replicate, DuplicatePolicy::Reject, 0.0).await;
        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.error.unwrap().contains("Failed to read"));
    }
}
