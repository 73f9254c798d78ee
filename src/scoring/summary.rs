use super::identify::{Classification, Identification};
use super::merge::{StepRecord, StepTable};
use crate::steps::{ErrorClass, Skill};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix for category counts over correctly identified errors
pub const RECOGNIZED_PREFIX: &str = "Type";

/// Prefix for category counts over every step the benchmark could contain
pub const ALL_PREFIX: &str = "All Type";

/// Confusion-matrix counts for one merged table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positives: u32,
    pub true_negatives: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
    pub addition_by_model: u32,
    /// Rows matching none of the confusion-matrix cells
    pub unknown_steps: u32,
    pub total_evaluated_steps: u32,
    pub steps_evaluated_minus_added_by_ai: u32,
    pub total_errors_analyzed: u32,
    pub correctly_classified_errors: u32,
}

impl ConfusionCounts {
    pub fn from_rows(rows: &[StepRecord]) -> Self {
        let mut counts = Self::default();

        for row in rows {
            counts.total_evaluated_steps += 1;
            match row.identification {
                Identification::ErrorCorrectlyIdentified => counts.true_positives += 1,
                Identification::NoErrorCorrectlyIdentified => counts.true_negatives += 1,
                Identification::FalsePositive => counts.false_positives += 1,
                Identification::FalseNegative => counts.false_negatives += 1,
                Identification::AdditionByModel => counts.addition_by_model += 1,
                Identification::Unknown => counts.unknown_steps += 1,
            }
            if row.classification == Classification::Correct {
                counts.correctly_classified_errors += 1;
            }
        }

        counts.steps_evaluated_minus_added_by_ai =
            counts.total_evaluated_steps - counts.addition_by_model;
        counts.total_errors_analyzed = counts.true_positives + counts.false_negatives;
        counts
    }

    /// Number of count metrics
    pub const LEN: usize = 10;

    fn named(&self) -> [(&'static str, u32); Self::LEN] {
        [
            ("true_positives", self.true_positives),
            ("true_negatives", self.true_negatives),
            ("false_positives", self.false_positives),
            ("false_negatives", self.false_negatives),
            ("total_evaluated_steps", self.total_evaluated_steps),
            ("steps_evaluated_minus_added_by_ai", self.steps_evaluated_minus_added_by_ai),
            ("addition_by_model", self.addition_by_model),
            ("unknown_steps", self.unknown_steps),
            ("total_errors_analyzed", self.total_errors_analyzed),
            ("correctly_classified_errors", self.correctly_classified_errors),
        ]
    }
}

/// Derived rates; every rate is 0 when its denominator is 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    pub classification_accuracy: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1_score: f64,
    pub balanced_accuracy: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub false_discovery_rate: f64,
    pub false_omission_rate: f64,
    pub positive_predictive_value: f64,
    pub negative_predictive_value: f64,
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl Rates {
    pub fn from_counts(c: &ConfusionCounts) -> Self {
        let (tp, tn, fp, fn_) = (
            c.true_positives,
            c.true_negatives,
            c.false_positives,
            c.false_negatives,
        );

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let specificity = ratio(tn, tn + fp);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            classification_accuracy: ratio(c.correctly_classified_errors, tp),
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
            precision,
            recall,
            specificity,
            f1_score,
            balanced_accuracy: (recall + specificity) / 2.0,
            false_positive_rate: ratio(fp, fp + tn),
            false_negative_rate: ratio(fn_, tp + fn_),
            false_discovery_rate: ratio(fp, tp + fp),
            false_omission_rate: ratio(fn_, tn + fn_),
            positive_predictive_value: precision,
            negative_predictive_value: ratio(tn, tn + fn_),
        }
    }

    /// Number of rate metrics
    pub const LEN: usize = 13;

    fn named(&self) -> [(&'static str, f64); Self::LEN] {
        [
            ("classification_accuracy", self.classification_accuracy),
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("specificity", self.specificity),
            ("f1_score", self.f1_score),
            ("balanced_accuracy", self.balanced_accuracy),
            ("false_positive_rate", self.false_positive_rate),
            ("false_negative_rate", self.false_negative_rate),
            ("false_discovery_rate", self.false_discovery_rate),
            ("false_omission_rate", self.false_omission_rate),
            ("positive_predictive_value", self.positive_predictive_value),
            ("negative_predictive_value", self.negative_predictive_value),
        ]
    }
}

/// Per-category and per-(category, skill) counts over a row subset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    by_class: BTreeMap<ErrorClass, u32>,
    by_class_skill: BTreeMap<(ErrorClass, Skill), u32>,
}

impl CategoryCounts {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a StepRecord>) -> Self {
        let mut counts = Self::default();
        for row in rows {
            let Some(class) = row.benchmark_class else {
                continue;
            };
            *counts.by_class.entry(class).or_default() += 1;
            if let Some(skill) = row.skill {
                *counts.by_class_skill.entry((class, skill)).or_default() += 1;
            }
        }
        counts
    }

    pub fn class(&self, class: ErrorClass) -> u32 {
        self.by_class.get(&class).copied().unwrap_or(0)
    }

    pub fn class_skill(&self, class: ErrorClass, skill: Skill) -> u32 {
        self.by_class_skill.get(&(class, skill)).copied().unwrap_or(0)
    }

    /// `"{prefix} {C}"` then `"{prefix} {C} {S}"` for the fixed category and skill sets
    pub fn labeled(&self, prefix: &str) -> Vec<(String, u32)> {
        let mut out = Vec::with_capacity(ErrorClass::ALL.len() * (Skill::ALL.len() + 1));
        for class in ErrorClass::ALL {
            out.push((format!("{} {}", prefix, class), self.class(class)));
        }
        for class in ErrorClass::ALL {
            for skill in Skill::ALL {
                out.push((
                    format!("{} {} {}", prefix, class, skill),
                    self.class_skill(class, skill),
                ));
            }
        }
        out
    }
}

/// A named metric; counts and rates aggregate differently across replicates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u32),
    Rate(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Count(c) => *c as f64,
            MetricValue::Rate(r) => *r,
        }
    }

    pub fn is_rate(&self) -> bool {
        matches!(self, MetricValue::Rate(_))
    }
}

impl From<MetricValue> for Value {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Count(c) => Value::from(c),
            MetricValue::Rate(r) => Value::from(r),
        }
    }
}

/// Full reduction of one merged table
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSummary {
    pub counts: ConfusionCounts,
    pub rates: Rates,
    /// Rows whose error was correctly identified
    pub recognized: CategoryCounts,
    /// Rows other than model additions
    pub all: CategoryCounts,
}

impl ErrorSummary {
    /// Leading entries of `metrics()` that are counts or rates; the category
    /// breakdown follows them
    pub const CORE_METRICS: usize = ConfusionCounts::LEN + Rates::LEN;

    pub fn from_table(table: &StepTable) -> Self {
        let rows = table.rows();
        let counts = ConfusionCounts::from_rows(rows);
        let rates = Rates::from_counts(&counts);

        let recognized = CategoryCounts::from_rows(
            rows.iter()
                .filter(|r| r.identification == Identification::ErrorCorrectlyIdentified),
        );
        let all = CategoryCounts::from_rows(
            rows.iter()
                .filter(|r| r.identification != Identification::AdditionByModel),
        );

        Self {
            counts,
            rates,
            recognized,
            all,
        }
    }

    /// Flat metric list in reporting order
    pub fn metrics(&self) -> Vec<(String, MetricValue)> {
        let mut out: Vec<(String, MetricValue)> = self
            .counts
            .named()
            .into_iter()
        .map(|(name, v)| (name.to_string(), MetricValue::Count(v)))
        .collect();

        out.extend(
            self.rates
                .named()
                .into_iter()
                .map(|(name, v)| (name.to_string(), MetricValue::Rate(v))),
        );

        for (prefix, counts) in [(RECOGNIZED_PREFIX, &self.recognized), (ALL_PREFIX, &self.all)] {
            out.extend(
                counts
                    .labeled(prefix)
                    .into_iter()
                    .map(|(name, v)| (name, MetricValue::Count(v))),
            );
        }

        out
    }

    /// The flat summary mapping, metric name to number
    pub fn to_map(&self) -> Map<String, Value> {
        self.metrics()
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect()
    }
}

impl Serialize for ErrorSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
