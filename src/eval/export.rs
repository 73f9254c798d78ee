use super::ratings::RatingSummary;
use super::results::EvaluationResults;
use crate::scoring::ErrorSummary;
use anyhow::Result;

/// Per-run confusion counts and rates, plus the "Summary / All" row
pub fn performance_metrics_csv(results: &EvaluationResults) -> Result<Vec<u8>> {
    metrics_csv(results, Some(ErrorSummary::CORE_METRICS))
}

/// Every metric column, including the per-category and per-skill breakdown
pub fn complete_analysis_csv(results: &EvaluationResults) -> Result<Vec<u8>> {
    metrics_csv(results, None)
}

/// Per-run rubric means, plus the "Summary / All" row
pub fn protocol_ratings_csv(results: &EvaluationResults) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["eval_set".to_string(), "replicate".to_string()];
    header.extend(
        RatingSummary::CRITERIA
            .iter()
            .map(|name| name.to_string()),
    );
    wtr.write_record(&header)?;

    let rated = results
        .ratings
        .iter()
        .filter_map(|r| r.summary.map(|s| (r.case_id.clone(), r.replicate.to_string(), s)))
        .chain(
            results
                .rating_summary
                .map(|s| ("Summary".to_string(), "All".to_string(), s)),
        );
    for (case_id, replicate, summary) in rated {
        let mut record = vec![case_id, replicate];
        record.extend(summary.named().iter().map(|(_, value)| value.to_string()));
        wtr.write_record(&record)?;
    }

    Ok(wtr.into_inner()?)
}

fn metrics_csv(results: &EvaluationResults, limit: Option<usize>) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let scored: Vec<_> = results
        .runs
        .iter()
        .filter_map(|run| run.score.as_ref().map(|score| (run, score.summary.metrics())))
        .collect();

    let take = |n: usize| limit.map_or(n, |l| l.min(n));

    let Some((_, first)) = scored.first() else {
        wtr.write_record(["eval_set", "replicate"])?;
        return Ok(wtr.into_inner()?);
    };

    let columns = take(first.len());
    let mut header = vec!["eval_set".to_string(), "replicate".to_string()];
    header.extend(first.iter().take(columns).map(|(name, _)| name.clone()));
    wtr.write_record(&header)?;

    for (run, metrics) in &scored {
        let mut record = vec![run.case_id.clone(), run.replicate.to_string()];
        record.extend(
            metrics
                .iter()
                .take(columns)
                .map(|(_, value)| value.as_f64().to_string()),
        );
        wtr.write_record(&record)?;
    }

    if let Some(ref aggregate) = results.aggregate {
        let mut record = vec!["Summary".to_string(), "All".to_string()];
        record.extend(
            aggregate
                .metrics
                .iter()
                .take(columns)
                .map(|(_, value)| value.to_string()),
        );
        wtr.write_record(&record)?;
    }

    Ok(wtr.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{MetricThresholds, ReplicateRun};
    use crate::eval::results::CaseRunResult;
    use crate::scoring::{score_documents, DuplicatePolicy};
    use serde_json::json;
    use std::path::PathBuf;

    fn results() -> EvaluationResults {
        let benchmark = json!([
            {"Step": 1.0, "Benchmark": "No Error", "Class": "N/A", "Skill": "N/A"},
            {"Step": 2.0, "Benchmark": "Error", "Class": "Omitted", "Skill": "Fast"}
        ]);
        let mut results = EvaluationResults::new("Export", "eval-x");
        for (replicate, response, class) in [(1, "Error", "Omitted"), (2, "No Error", "N/A")] {
            let ai = json!([
                {"step": 1.0, "ai_response": "No Error", "ai_class": "N/A"},
                {"step": 2.0, "ai_response": response, "ai_class": class}
            ]);
            let run = ReplicateRun {
                case_id: "case-1".to_string(),
                case_index: 0,
                replicate,
                benchmark: PathBuf::from("bench.json"),
                ai_output: PathBuf::from("run.json"),
            };
            let mut result = CaseRunResult::new(&format!("run-{}", replicate), &run);
            result.complete_with_score(
                score_documents(&benchmark, &ai, DuplicatePolicy::Reject).unwrap(),
            );
            results.add_run(result);
        }
        results.finalize(&MetricThresholds::default());
        results
    }

    fn rows(data: Vec<u8>) -> Vec<csv::StringRecord> {
        csv::Reader::from_reader(data.as_slice())
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_performance_metrics_has_summary_row() {
        let data = performance_metrics_csv(&results()).unwrap();
        let header = csv::Reader::from_reader(data.as_slice())
            .headers()
            .unwrap()
            .clone();
        assert_eq!(header.len(), 2 + ErrorSummary::CORE_METRICS);
        assert_eq!(&header[2], "true_positives");
        assert_eq!(header.iter().last(), Some("negative_predictive_value"));

        let rows = rows(data);
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "case-1");
        assert_eq!(&rows[2][0], "Summary");
        assert_eq!(&rows[2][1], "All");
        // (1 + 0) true positives over 2 replicates
        assert_eq!(&rows[2][2], "0.5");
    }

    #[test]
    fn test_complete_analysis_includes_breakdown() {
        let data = complete_analysis_csv(&results()).unwrap();
        let header = csv::Reader::from_reader(data.as_slice())
            .headers()
            .unwrap()
            .clone();
        assert!(header.iter().any(|h| h == "All Type Omitted Fast"));
        assert!(header.len() > 2 + ErrorSummary::CORE_METRICS);
    }

    #[test]
    fn test_protocol_ratings_csv() {
        use crate::cli::RatingRun;
        use crate::eval::ratings::parse_rating_document;
        use crate::eval::results::RatingRunResult;

        let mut results = EvaluationResults::new("Ratings", "eval-r");
        for (replicate, value) in [(1, 4), (2, 2)] {
            let sections = parse_rating_document(&json!([{
                "section": "Procedure - Step 1",
                "completeness_rating": value,
                "technical_accuracy_rating": value,
                "logical_flow_rating": value,
                "safety_rating": value,
                "formatting_rating": value
            }]))
            .unwrap();
            let summary = RatingSummary::from_sections(&sections).unwrap();
            let mut result = RatingRunResult::new(&RatingRun {
                case_id: "protocol-a".to_string(),
                case_index: 0,
                replicate,
                path: PathBuf::from("ratings.json"),
            });
            result.complete_with_sections(sections, summary);
            results.add_rating(result);
        }
        results.finalize(&MetricThresholds::default());

        let data = protocol_ratings_csv(&results).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.starts_with(
            "eval_set,replicate,Completeness,Technical Accuracy,Logical Flow,Safety,Formatting,Overall\n"
        ));
        let rows = rows(data);
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][2], "4");
        assert_eq!(&rows[2][0], "Summary");
        assert_eq!(&rows[2][7], "3");
    }

    #[test]
    fn test_empty_results_write_header_only() {
        let data = performance_metrics_csv(&EvaluationResults::new("Empty", "e")).unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "eval_set,replicate\n");
    }
}
