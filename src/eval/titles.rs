use crate::cli::TitleCaseConfig;
use crate::scoring::rouge::{best_rouge1, candidate_titles, expected_titles};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Running totals across title evaluations, owned by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleScoreAccumulator {
    pub total_cases: u32,
    pub passed: u32,
    pub total_score: f64,
}

impl TitleScoreAccumulator {
    pub fn record(&mut self, outcome: &TitleOutcome) {
        self.total_cases += 1;
        self.total_score += outcome.score;
        if outcome.passed {
            self.passed += 1;
        }
    }

    pub fn mean_score(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.total_score / self.total_cases as f64
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.passed as f64 / self.total_cases as f64
        }
    }
}

/// Result for a single title case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleOutcome {
    pub id: String,
    pub candidates: Vec<String>,
    pub expected: Vec<String>,
    pub score: f64,
    pub passed: bool,
}

/// Result of one batch of title cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleEvaluation {
    pub threshold: f64,
    pub outcomes: Vec<TitleOutcome>,
    /// Mean score over this batch
    pub overall_score: f64,
    pub passed: bool,
}

pub fn score_title(case: &TitleCaseConfig, threshold: f64) -> TitleOutcome {
    let candidates = candidate_titles(&case.response);
    let expected = expected_titles(&case.expected);
    let score = best_rouge1(&candidates, &expected);

    TitleOutcome {
        id: case.id.clone(),
        candidates,
        expected,
        score,
        passed: score >= threshold,
    }
}

/// Score every title case, updating `accumulator` as each case completes
pub fn evaluate_titles(
    cases: &[TitleCaseConfig],
    threshold: f64,
    accumulator: &mut TitleScoreAccumulator,
) -> TitleEvaluation {
    let outcomes: Vec<TitleOutcome> = cases
        .iter()
        .map(|case| {
            let outcome = score_title(case, threshold);
            info!(
                "Title case '{}': ROUGE-1 F-measure {:.4} ({})",
                outcome.id,
                outcome.score,
                if outcome.passed { "passed" } else { "failed" }
            );
            accumulator.record(&outcome);
            outcome
        })
        .collect();

    let overall_score = if outcomes.is_empty() {
        0.0
    } else {
        outcomes.iter().map(|o| o.score).sum::<f64>() / outcomes.len() as f64
    };

    info!(
        "Cumulative title scoring: {}/{} passed ({:.1}%), mean score {:.4}",
        accumulator.passed,
        accumulator.total_cases,
        accumulator.pass_rate() * 100.0,
        accumulator.mean_score()
    );

    TitleEvaluation {
        threshold,
        passed: !outcomes.is_empty() && overall_score >= threshold,
        outcomes,
        overall_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, response: &str, expected: &str) -> TitleCaseConfig {
        TitleCaseConfig {
            id: id.to_string(),
            response: response.to_string(),
            expected: expected.to_string(),
        }
    }

    #[test]
    fn test_score_title_pass_and_fail() {
        let hit = score_title(
            &case("a", "The protocol is \"Ion source cleaning\".", "Ion source cleaning"),
            0.7,
        );
        assert!(hit.passed);
        assert!((hit.score - 1.0).abs() < 1e-12);

        let miss = score_title(&case("b", "\"Column change\"", "Ion source cleaning"), 0.7);
        assert!(!miss.passed);
        assert_eq!(miss.score, 0.0);
    }

    #[test]
    fn test_unquoted_answer_scores_zero() {
        let outcome = score_title(
            &case("c", "Looks like an ion source cleaning to me", "Ion source cleaning"),
            0.7,
        );
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.score, 0.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_stemmed_title_passes() {
        let outcome = score_title(&case("d", "'Cleaning ion sources'", "Clean ion source"), 0.7);
        assert!(outcome.passed);
    }

    #[test]
    fn test_accumulator_spans_batches() {
        let mut acc = TitleScoreAccumulator::default();

        let first = evaluate_titles(&[case("a", "\"Needle wash\"", "Needle wash")], 0.7, &mut acc);
        assert!(first.passed);

        let second = evaluate_titles(&[case("b", "\"Column change\"", "Needle wash")], 0.7, &mut acc);
        assert!(!second.passed);

        assert_eq!(acc.total_cases, 2);
        assert_eq!(acc.passed, 1);
        assert!((acc.mean_score() - 0.5).abs() < 1e-12);
        assert!((acc.pass_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_separate_accumulators_do_not_share_state() {
        let mut a = TitleScoreAccumulator::default();
        let mut b = TitleScoreAccumulator::default();
        evaluate_titles(&[case("a", "\"Needle wash\"", "Needle wash")], 0.7, &mut a);
        assert_eq!(a.total_cases, 1);
        assert_eq!(b, TitleScoreAccumulator::default());
        evaluate_titles(&[], 0.7, &mut b);
        assert_eq!(b.total_cases, 0);
        assert_eq!(b.mean_score(), 0.0);
    }
}
