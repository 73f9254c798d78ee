use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Placeholder used by both documents for "no category" / "not present"
pub const NOT_APPLICABLE: &str = "N/A";

/// Ground-truth judgment for a protocol step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BenchmarkLabel {
    #[serde(rename = "Error")]
    Error,
    #[serde(rename = "No Error")]
    NoError,
}

impl fmt::Display for BenchmarkLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkLabel::Error => write!(f, "Error"),
            BenchmarkLabel::NoError => write!(f, "No Error"),
        }
    }
}

impl FromStr for BenchmarkLabel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Error" => Ok(BenchmarkLabel::Error),
            "No Error" => Ok(BenchmarkLabel::NoError),
            _ => Err(()),
        }
    }
}

/// The model's error/no-error call for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiResponse {
    #[serde(rename = "Error")]
    Error,
    #[serde(rename = "No Error")]
    NoError,
}

impl fmt::Display for AiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiResponse::Error => write!(f, "Error"),
            AiResponse::NoError => write!(f, "No Error"),
        }
    }
}

impl FromStr for AiResponse {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Error" => Ok(AiResponse::Error),
            "No Error" => Ok(AiResponse::NoError),
            _ => Err(()),
        }
    }
}

/// Closed set of lab-note error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    #[serde(rename = "Omitted")]
    Omitted,
    #[serde(rename = "Error")]
    Error,
    #[serde(rename = "Addition")]
    Addition,
    #[serde(rename = "Deviation")]
    Deviation,
    #[serde(rename = "Deviation & Error")]
    DeviationAndError,
}

impl ErrorClass {
    /// Every category, in reporting order
    pub const ALL: [ErrorClass; 5] = [
        ErrorClass::Omitted,
        ErrorClass::Error,
        ErrorClass::Addition,
        ErrorClass::Deviation,
        ErrorClass::DeviationAndError,
    ];

    /// Human-facing name used in charts and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorClass::Omitted => "Omitted",
            ErrorClass::Error => "Error",
            ErrorClass::Addition => "Added",
            ErrorClass::Deviation => "Deviation in step order",
            ErrorClass::DeviationAndError => "Deviation & Error",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Omitted => write!(f, "Omitted"),
            ErrorClass::Error => write!(f, "Error"),
            ErrorClass::Addition => write!(f, "Addition"),
            ErrorClass::Deviation => write!(f, "Deviation"),
            ErrorClass::DeviationAndError => write!(f, "Deviation & Error"),
        }
    }
}

impl FromStr for ErrorClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorClass::ALL
            .into_iter()
            .find(|class| class.to_string() == s)
            .ok_or(())
    }
}

/// Skill needed to recognize an error, orthogonal to its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    SpatialOrientation,
    SpatialResolution,
    GeneralKnowledge,
    Fast,
    ProteomicsKnowledge,
}

impl Skill {
    /// Every skill, in reporting order
    pub const ALL: [Skill; 5] = [
        Skill::SpatialOrientation,
        Skill::SpatialResolution,
        Skill::GeneralKnowledge,
        Skill::Fast,
        Skill::ProteomicsKnowledge,
    ];
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::SpatialOrientation => write!(f, "SpatialOrientation"),
            Skill::SpatialResolution => write!(f, "SpatialResolution"),
            Skill::GeneralKnowledge => write!(f, "GeneralKnowledge"),
            Skill::Fast => write!(f, "Fast"),
            Skill::ProteomicsKnowledge => write!(f, "ProteomicsKnowledge"),
        }
    }
}

impl FromStr for Skill {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::ALL
            .into_iter()
            .find(|skill| skill.to_string() == s)
            .ok_or(())
    }
}

/// Protocol step number; fractional values mark inserted sub-steps (`8.1`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepNumber(f64);

impl StepNumber {
    /// Returns `None` for NaN and infinities
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for StepNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StepNumber {}

impl PartialOrd for StepNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StepNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0.0 and 0.0 are the same step
        (self.0 + 0.0).total_cmp(&(other.0 + 0.0))
    }
}

impl fmt::Display for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One ground-truth entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStep {
    pub step: StepNumber,
    pub benchmark: Option<BenchmarkLabel>,
    pub class: Option<ErrorClass>,
    pub skill: Option<Skill>,
}

impl BenchmarkStep {
    /// Validate a raw benchmark record (`Step`, `Benchmark`, `Class`, `Skill`).
    ///
    /// `Step` is required. When `Benchmark` is missing it is inferred from
    /// `Class`: `"N/A"` or `"No Error"` mean no error, a category means error.
    pub fn from_value(value: &Value) -> Result<Self, ScoringError> {
        let record = as_record(value)?;
        let step = required_step(value, record, "Step")?;

        let class_raw = optional_str(value, record, "Class")?;
        let class = match class_raw {
            None | Some(NOT_APPLICABLE) | Some("No Error") => None,
            Some(raw) => Some(parse_field::<ErrorClass>(value, "Class", raw)?),
        };

        let benchmark = match optional_str(value, record, "Benchmark")? {
            Some(raw) => Some(parse_field::<BenchmarkLabel>(value, "Benchmark", raw)?),
            None if class_raw.is_some() => Some(if class.is_some() {
                BenchmarkLabel::Error
            } else {
                BenchmarkLabel::NoError
            }),
            None => None,
        };

        let skill = match optional_str(value, record, "Skill")? {
            None | Some(NOT_APPLICABLE) => None,
            Some(raw) => Some(parse_field::<Skill>(value, "Skill", raw)?),
        };

        Ok(Self {
            step,
            benchmark,
            class,
            skill,
        })
    }
}

/// One entry of the model's extracted error list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiStep {
    pub step: StepNumber,
    pub response: AiResponse,
    pub class: Option<ErrorClass>,
}

impl AiStep {
    /// Validate a raw AI record (`step`, `ai_response`, `ai_class`, all required)
    pub fn from_value(value: &Value) -> Result<Self, ScoringError> {
        let record = as_record(value)?;
        let step = required_step(value, record, "step")?;

        let response_raw = optional_str(value, record, "ai_response")?.ok_or_else(|| {
            ScoringError::MalformedStep {
                field: "ai_response",
                record: value.to_string(),
            }
        })?;
        let response = parse_field::<AiResponse>(value, "ai_response", response_raw)?;

        let class = match optional_str(value, record, "ai_class")? {
            None => {
                return Err(ScoringError::MalformedStep {
                    field: "ai_class",
                    record: value.to_string(),
                })
            }
            Some(NOT_APPLICABLE) => None,
            Some(raw) => Some(parse_field::<ErrorClass>(value, "ai_class", raw)?),
        };

        Ok(Self {
            step,
            response,
            class,
        })
    }
}

type Record = serde_json::Map<String, Value>;

fn as_record(value: &Value) -> Result<&Record, ScoringError> {
    value.as_object().ok_or(ScoringError::InvalidDocument {
        expected: "each step to be a JSON object",
    })
}

fn required_step(
    value: &Value,
    record: &Record,
    field: &'static str,
) -> Result<StepNumber, ScoringError> {
    let raw = record.get(field).ok_or_else(|| ScoringError::MalformedStep {
        field,
        record: value.to_string(),
    })?;

    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ScoringError::InvalidField {
        field,
        value: raw.to_string(),
        record: value.to_string(),
    })?;

    StepNumber::new(number).ok_or_else(|| ScoringError::InvalidStepNumber {
        record: value.to_string(),
    })
}

/// Missing and `null` are both "absent"; any other non-string is rejected
fn optional_str<'a>(
    value: &Value,
    record: &'a Record,
    field: &'static str,
) -> Result<Option<&'a str>, ScoringError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ScoringError::InvalidField {
            field,
            value: other.to_string(),
            record: value.to_string(),
        }),
    }
}

fn parse_field<T: FromStr>(value: &Value, field: &'static str, raw: &str) -> Result<T, ScoringError> {
    raw.parse::<T>().map_err(|_| ScoringError::InvalidField {
        field,
        value: raw.to_string(),
        record: value.to_string(),
    })
}
