use crate::cli::MetricThresholds;
use crate::scoring::{ErrorSummary, MetricValue, ALL_PREFIX, RECOGNIZED_PREFIX};
use crate::steps::{ErrorClass, Skill};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The "Summary / All" row across every completed replicate.
///
/// Counts are summed and divided by the number of distinct replicates;
/// rates are the mean over runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub num_runs: usize,
    pub num_replicates: usize,
    pub metrics: Vec<(String, f64)>,
}

impl AggregateRow {
    /// `runs` pairs each summary with its replicate number; `None` when empty
    pub fn from_summaries(runs: &[(u32, &ErrorSummary)]) -> Option<Self> {
        let (_, first) = runs.first()?;
        let replicates: BTreeSet<u32> = runs.iter().map(|(r, _)| *r).collect();
        let num_replicates = replicates.len();
        let per_run: Vec<Vec<(String, MetricValue)>> =
            runs.iter().map(|(_, summary)| summary.metrics()).collect();

        let metrics = first
            .metrics()
            .into_iter()
            .enumerate()
            .map(|(i, (name, kind))| {
                let total: f64 = per_run.iter().map(|m| m[i].1.as_f64()).sum();
                let value = if kind.is_rate() {
                    total / runs.len() as f64
                } else {
                    total / num_replicates as f64
                };
                (name, value)
            })
            .collect();

        Some(Self {
            num_runs: runs.len(),
            num_replicates,
            metrics,
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|(_, value)| *value)
    }

    fn count(&self, name: &str) -> u32 {
        self.get(name).unwrap_or(0.0) as u32
    }

    /// Recognized/unrecognized split per skill, for categories that occur at all
    pub fn skill_recognition(&self) -> Vec<SkillRecognition> {
        ErrorClass::ALL
            .into_iter()
            .filter_map(|class| {
                let total = self.get(&format!("{} {}", ALL_PREFIX, class)).unwrap_or(0.0);
                if total == 0.0 {
                    return None;
                }
                let skills = Skill::ALL
                    .into_iter()
                    .filter_map(|skill| {
                        let recognized =
                            self.count(&format!("{} {} {}", RECOGNIZED_PREFIX, class, skill));
                        let all = self.count(&format!("{} {} {}", ALL_PREFIX, class, skill));
                        let unrecognized = all.saturating_sub(recognized);
                        (recognized > 0 || unrecognized > 0).then_some(SkillSplit {
                            skill,
                            recognized,
                            unrecognized,
                        })
                    })
                    .collect();
                Some(SkillRecognition {
                    name: class.display_name().to_string(),
                    total: total as u32,
                    skills,
                })
            })
            .collect()
    }

    /// Per-skill sums over every category
    pub fn skill_totals(&self) -> Vec<SkillTotal> {
        Skill::ALL
            .into_iter()
            .map(|skill| {
                let sum = |prefix: &str| -> f64 {
                    ErrorClass::ALL
                        .into_iter()
                        .map(|class| {
                            self.get(&format!("{} {} {}", prefix, class, skill))
                                .unwrap_or(0.0)
                        })
                        .sum()
                };
                SkillTotal {
                    skill,
                    recognized: sum(RECOGNIZED_PREFIX),
                    all: sum(ALL_PREFIX),
                }
            })
            .collect()
    }

    pub fn verdict(&self, thresholds: &MetricThresholds) -> ThresholdVerdict {
        let failures: Vec<ThresholdFailure> = thresholds
            .entries()
            .into_iter()
            .filter_map(|(metric, minimum)| {
                let value = self.get(metric).unwrap_or(0.0);
                (value < minimum).then(|| ThresholdFailure {
                    metric: metric.to_string(),
                    value,
                    minimum,
                })
            })
            .collect();

        ThresholdVerdict {
            passed: failures.is_empty(),
            failures,
        }
    }
}

/// How often errors of one category were recognized, split by skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecognition {
    pub name: String,
    pub total: u32,
    pub skills: Vec<SkillSplit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSplit {
    pub skill: Skill,
    pub recognized: u32,
    pub unrecognized: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTotal {
    pub skill: Skill,
    pub recognized: f64,
    pub all: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdVerdict {
    pub passed: bool,
    pub failures: Vec<ThresholdFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFailure {
    pub metric: String,
    pub value: f64,
    pub minimum: f64,
}
