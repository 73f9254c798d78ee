use super::identify::{classify, identify, Classification, Identification};
use crate::error::{ScoringError, Side};
use crate::steps::{AiResponse, AiStep, BenchmarkLabel, BenchmarkStep, ErrorClass, Skill, StepNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// What to do when a step number repeats within one input list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail the merge
    #[default]
    Reject,
    /// Log a warning and keep the first occurrence
    KeepFirst,
}

/// One row of the merged benchmark/model table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepNumber,
    /// `None` when the step only exists in the model output
    pub benchmark: Option<BenchmarkLabel>,
    pub benchmark_class: Option<ErrorClass>,
    pub skill: Option<Skill>,
    /// `None` when the step is absent from the model output
    pub ai_response: Option<AiResponse>,
    pub ai_class: Option<ErrorClass>,
    pub identification: Identification,
    pub classification: Classification,
}

impl StepRecord {
    /// Build a row and derive its identification and classification
    pub fn new(
        step: StepNumber,
        benchmark: Option<&BenchmarkStep>,
        ai: Option<&AiStep>,
    ) -> Self {
        let benchmark_label = benchmark.and_then(|b| b.benchmark);
        let benchmark_class = benchmark.and_then(|b| b.class);
        let skill = benchmark.and_then(|b| b.skill);
        let ai_response = ai.map(|a| a.response);
        let ai_class = ai.and_then(|a| a.class);

        let identification = identify(benchmark_label, benchmark_class, ai_response, ai_class);
        let classification = classify(identification, benchmark_class, ai_class);

        Self {
            step,
            benchmark: benchmark_label,
            benchmark_class,
            skill,
            ai_response,
            ai_class,
            identification,
            classification,
        }
    }
}

/// Step-indexed table produced by the outer join, ordered by step number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepTable {
    rows: Vec<StepRecord>,
}

impl StepTable {
    pub fn rows(&self) -> &[StepRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self, identification: Identification) -> usize {
        self.rows
            .iter()
            .filter(|row| row.identification == identification)
            .count()
    }
}

/// Outer-join the benchmark and model step lists on step number
pub fn merge_steps(
    benchmark: &[BenchmarkStep],
    ai: &[AiStep],
    policy: DuplicatePolicy,
) -> Result<StepTable, ScoringError> {
    let mut joined: BTreeMap<StepNumber, (Option<&BenchmarkStep>, Option<&AiStep>)> =
        BTreeMap::new();

    for entry in benchmark {
        let slot = &mut joined.entry(entry.step).or_default().0;
        place(slot, entry, entry.step, Side::Benchmark, policy)?;
    }

    for entry in ai {
        let slot = &mut joined.entry(entry.step).or_default().1;
        place(slot, entry, entry.step, Side::Ai, policy)?;
    }

    let rows = joined
        .into_iter()
        .map(|(step, (b, a))| StepRecord::new(step, b, a))
        .collect();

    Ok(StepTable { rows })
}

fn place<'a, T>(
    slot: &mut Option<&'a T>,
    entry: &'a T,
    step: StepNumber,
    side: Side,
    policy: DuplicatePolicy,
) -> Result<(), ScoringError> {
    if slot.is_none() {
        *slot = Some(entry);
        return Ok(());
    }

    match policy {
        DuplicatePolicy::Reject => Err(ScoringError::DuplicateStep {
            side,
            step: step.value(),
        }),
        DuplicatePolicy::KeepFirst => {
            warn!("Step {} repeats in the {} list; keeping the first entry", step, side);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn n(v: f64) -> StepNumber {
        StepNumber::new(v).unwrap()
    }

    fn bench(step: f64, label: BenchmarkLabel, class: Option<ErrorClass>) -> BenchmarkStep {
        BenchmarkStep {
            step: n(step),
            benchmark: Some(label),
            class,
            skill: None,
        }
    }

    fn ai(step: f64, response: AiResponse, class: Option<ErrorClass>) -> AiStep {
        AiStep {
            step: n(step),
            response,
            class,
        }
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let benchmark = vec![
            bench(2.0, BenchmarkLabel::Error, Some(ErrorClass::Omitted)),
            bench(1.0, BenchmarkLabel::NoError, None),
        ];
        let model = vec![
            ai(1.0, AiResponse::NoError, None),
            ai(8.1, AiResponse::Error, Some(ErrorClass::Addition)),
        ];

        let table = merge_steps(&benchmark, &model, DuplicatePolicy::Reject).unwrap();
        let steps: Vec<f64> = table.rows().iter().map(|r| r.step.value()).collect();
        assert_eq!(steps, vec![1.0, 2.0, 8.1]);
        let union: BTreeSet<StepNumber> = benchmark
            .iter()
            .map(|b| b.step)
            .chain(model.iter().map(|a| a.step))
            .collect();
        assert_eq!(steps.len(), union.len());

        let only_benchmark = &table.rows()[1];
        assert_eq!(only_benchmark.ai_response, None);
        assert_eq!(only_benchmark.ai_class, None);
        assert_eq!(only_benchmark.identification, Identification::Unknown);

        let only_model = &table.rows()[2];
        assert_eq!(only_model.benchmark, None);
        assert_eq!(only_model.benchmark_class, None);
        assert_eq!(only_model.identification, Identification::AdditionByModel);
    }

    #[test]
    fn test_classification_derived_per_row() {
        let benchmark = vec![bench(3.0, BenchmarkLabel::Error, Some(ErrorClass::Omitted))];
        let model = vec![ai(3.0, AiResponse::Error, Some(ErrorClass::Omitted))];

        let table = merge_steps(&benchmark, &model, DuplicatePolicy::Reject).unwrap();
        assert_eq!(table.rows()[0].identification, Identification::ErrorCorrectlyIdentified);
        assert_eq!(table.rows()[0].classification, Classification::Correct);
    }

    #[test]
    fn test_duplicates_rejected_by_default() {
        let model = vec![
            ai(1.0, AiResponse::NoError, None),
            ai(1.0, AiResponse::Error, Some(ErrorClass::Error)),
        ];
        let err = merge_steps(&[], &model, DuplicatePolicy::default()).unwrap_err();
        assert!(matches!(err, ScoringError::DuplicateStep { side: Side::Ai, .. }));
    }

    #[test]
    fn test_duplicates_keep_first() {
        let benchmark = vec![
            bench(1.0, BenchmarkLabel::NoError, None),
            bench(1.0, BenchmarkLabel::Error, Some(ErrorClass::Error)),
        ];
        let model = vec![ai(1.0, AiResponse::NoError, None)];

        let table = merge_steps(&benchmark, &model, DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows()[0].identification,
            Identification::NoErrorCorrectlyIdentified
        );
    }

    #[test]
    fn test_empty_inputs() {
        let table = merge_steps(&[], &[], DuplicatePolicy::Reject).unwrap();
        assert!(table.is_empty());
    }
}
