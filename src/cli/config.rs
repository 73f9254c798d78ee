use crate::scoring::DuplicatePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Name of this evaluation
    pub name: String,

    /// Description of the evaluation
    #[serde(default)]
    pub description: String,

    /// Lab-note error cases, each with one or more model outputs
    #[serde(default)]
    pub cases: Vec<CaseConfig>,

    /// Protocol title cases scored with ROUGE-1
    #[serde(default)]
    pub title_cases: Vec<TitleCaseConfig>,

    /// Rubric rating files for generated protocols
    #[serde(default)]
    pub protocol_ratings: Vec<RatingCaseConfig>,

    /// Global settings
    #[serde(default)]
    pub settings: EvalSettings,
}

/// One benchmark case and the model outputs to score against it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseConfig {
    /// Unique identifier for this case
    pub id: String,

    /// Ground-truth step list (JSON)
    pub benchmark: PathBuf,

    /// Extracted model step lists (JSON), one per replicate run
    pub ai_outputs: Vec<PathBuf>,
}

/// A free-text response and the protocol title(s) it should name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleCaseConfig {
    pub id: String,
    pub response: String,
    /// Comma-separated when several titles are acceptable
    pub expected: String,
}

/// Rubric ratings of one generated protocol, one file per replicate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingCaseConfig {
    pub id: String,
    pub ratings: Vec<PathBuf>,
}

/// One replicate of one rating case
#[derive(Debug, Clone)]
pub struct RatingRun {
    pub case_id: String,
    pub case_index: usize,
    pub replicate: u32,
    pub path: PathBuf,
}

/// One replicate of one case, ready to score
#[derive(Debug, Clone)]
pub struct ReplicateRun {
    pub case_id: String,
    pub case_index: usize,
    pub replicate: u32,
    pub benchmark: PathBuf,
    pub ai_output: PathBuf,
}

/// Global evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSettings {
    /// Output directory for results
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Handling of repeated step numbers within one list
    #[serde(default)]
    pub duplicate_steps: DuplicatePolicy,

    /// Minimum aggregated metrics for a passing evaluation
    #[serde(default)]
    pub thresholds: MetricThresholds,

    /// Minimum mean ROUGE-1 score for the title cases
    #[serde(default = "default_title_threshold")]
    pub title_threshold: f64,

    /// Warn when the share of Unknown rows in a run exceeds this
    #[serde(default)]
    pub unknown_warn_ratio: f64,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            duplicate_steps: DuplicatePolicy::default(),
            thresholds: MetricThresholds::default(),
            title_threshold: default_title_threshold(),
            unknown_warn_ratio: 0.0,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./lab_note_eval_logs")
}

fn default_title_threshold() -> f64 {
    0.7
}

fn default_metric_threshold() -> f64 {
    0.5
}

/// Thresholds checked against the aggregated summary row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    #[serde(default = "default_metric_threshold")]
    pub accuracy: f64,
    #[serde(default = "default_metric_threshold")]
    pub precision: f64,
    #[serde(default = "default_metric_threshold")]
    pub recall: f64,
    #[serde(default = "default_metric_threshold")]
    pub f1_score: f64,
}

impl Default for MetricThresholds {
    fn default() -> Self {
        Self {
            accuracy: default_metric_threshold(),
            precision: default_metric_threshold(),
            recall: default_metric_threshold(),
            f1_score: default_metric_threshold(),
        }
    }
}

impl MetricThresholds {
    /// Metric name and minimum value, in reporting order
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1_score),
        ]
    }
}

impl EvalConfig {
    /// Load configuration from a YAML file.
    ///
    /// Relative case paths are resolved against the config file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let mut config: EvalConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        if let Some(base) = path.as_ref().parent() {
            config.resolve_paths(base);
        }

        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .context(format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for case in &mut self.cases {
            resolve(&mut case.benchmark);
            case.ai_outputs.iter_mut().for_each(resolve);
        }
        for case in &mut self.protocol_ratings {
            case.ratings.iter_mut().for_each(resolve);
        }
    }

    /// Expand every case into its replicate runs (replicates numbered from 1)
    pub fn replicate_runs(&self) -> Vec<ReplicateRun> {
        let mut result = Vec::new();
        for (case_index, case) in self.cases.iter().enumerate() {
            for (i, ai_output) in case.ai_outputs.iter().enumerate() {
                result.push(ReplicateRun {
                    case_id: case.id.clone(),
                    case_index,
                    replicate: (i + 1) as u32,
                    benchmark: case.benchmark.clone(),
                    ai_output: ai_output.clone(),
                });
            }
        }
        result
    }

    /// Expand every rating case into its replicate runs (replicates numbered from 1)
    pub fn rating_runs(&self) -> Vec<RatingRun> {
        let mut result = Vec::new();
        for (case_index, case) in self.protocol_ratings.iter().enumerate() {
            for (i, path) in case.ratings.iter().enumerate() {
                result.push(RatingRun {
                    case_id: case.id.clone(),
                    case_index,
                    replicate: (i + 1) as u32,
                    path: path.clone(),
                });
            }
        }
        result
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        Self {
            name: "Lab Note Evaluation".to_string(),
            description: "Scores extracted lab-note errors against the benchmark".to_string(),
            cases: vec![CaseConfig {
                id: "tims_calibration".to_string(),
                benchmark: PathBuf::from("./benchmark/tims_calibration.json"),
                ai_outputs: vec![
                    PathBuf::from("./runs/tims_calibration_run1.json"),
                    PathBuf::from("./runs/tims_calibration_run2.json"),
                ],
            }],
            title_cases: vec![TitleCaseConfig {
                id: "evosep_column_change".to_string(),
                response: "This video shows the protocol \"Evosep column change\".".to_string(),
                expected: "Evosep column change, Changing the analytical column".to_string(),
            }],
            protocol_ratings: vec![RatingCaseConfig {
                id: "evosep_column_change".to_string(),
                ratings: vec![PathBuf::from("./ratings/evosep_column_change_run1.json")],
            }],
            settings: EvalSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config() {
        let config = EvalConfig::sample();
        assert_eq!(config.cases.len(), 1);
        assert_eq!(config.title_cases.len(), 1);
        assert_eq!(config.settings.duplicate_steps, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_replicate_runs() {
        let config = EvalConfig::sample();
        let runs = config.replicate_runs();
        assert_eq!(runs.len(), 2); // 1 case * 2 outputs
        assert_eq!(runs[0].replicate, 1);
        assert_eq!(runs[1].replicate, 2);
        assert_eq!(runs[1].case_id, "tims_calibration");
    }

    #[test]
    fn test_rating_runs() {
        let yaml = r#"
name: ratings
protocol_ratings:
  - id: p1
    ratings: [a.json, b.json]
  - id: p2
    ratings: [c.json]
"#;
        let config: EvalConfig = serde_yaml::from_str(yaml).unwrap();
        let runs = config.rating_runs();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].replicate, 2);
        assert_eq!(runs[2].case_id, "p2");
        assert_eq!(runs[2].case_index, 1);
    }

    #[test]
    fn test_defaults_when_settings_omitted() {
        let yaml = r#"
name: minimal
cases:
  - id: a
    benchmark: bench.json
    ai_outputs: [run1.json]
settings:
  duplicate_steps: keep-first
  thresholds:
    recall: 0.8
"#;
        let config: EvalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.settings.duplicate_steps, DuplicatePolicy::KeepFirst);
        assert_eq!(config.settings.thresholds.recall, 0.8);
        assert_eq!(config.settings.thresholds.accuracy, 0.5);
        assert_eq!(config.settings.title_threshold, 0.7);
        assert!(config.title_cases.is_empty());
        assert!(config.protocol_ratings.is_empty());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        EvalConfig::sample().save(&path).unwrap();

        let loaded = EvalConfig::load(&path).unwrap();
        assert!(loaded.cases[0].benchmark.starts_with(dir.path()));
        assert!(loaded.cases[0].ai_outputs[1].starts_with(dir.path()));
        assert!(loaded.protocol_ratings[0].ratings[0].starts_with(dir.path()));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = EvalConfig::sample();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EvalConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.title_cases[0].expected, config.title_cases[0].expected);
    }
}
