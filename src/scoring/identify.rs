use crate::steps::{AiResponse, BenchmarkLabel, ErrorClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing the model's error call against the benchmark's.
///
/// "Positive" means "the step contains an error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identification {
    #[serde(rename = "Error (Correctly Identified)")]
    ErrorCorrectlyIdentified,
    #[serde(rename = "No Error (Correctly Identified)")]
    NoErrorCorrectlyIdentified,
    #[serde(rename = "False Positive")]
    FalsePositive,
    #[serde(rename = "False Negative")]
    FalseNegative,
    /// A step the model invented that the benchmark does not contain
    #[serde(rename = "Addition by model")]
    AdditionByModel,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identification::ErrorCorrectlyIdentified => write!(f, "Error (Correctly Identified)"),
            Identification::NoErrorCorrectlyIdentified => {
                write!(f, "No Error (Correctly Identified)")
            }
            Identification::FalsePositive => write!(f, "False Positive"),
            Identification::FalseNegative => write!(f, "False Negative"),
            Identification::AdditionByModel => write!(f, "Addition by model"),
            Identification::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Whether the predicted category matched, given a correctly identified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "correct")]
    Correct,
    #[serde(rename = "incorrect")]
    Incorrect,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Correct => write!(f, "correct"),
            Classification::Incorrect => write!(f, "incorrect"),
            Classification::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Label one merged row. First matching arm wins; anything unmatched is `Unknown`.
///
/// `None` stands for a missing benchmark entry or an `"N/A"` model field.
pub fn identify(
    benchmark: Option<BenchmarkLabel>,
    benchmark_class: Option<ErrorClass>,
    ai_response: Option<AiResponse>,
    ai_class: Option<ErrorClass>,
) -> Identification {
    match (benchmark, ai_response) {
        (None, _) => match (ai_class, benchmark_class) {
            (Some(ErrorClass::Addition), _) => Identification::AdditionByModel,
            (None, Some(ErrorClass::Addition)) => Identification::FalseNegative,
            _ => Identification::Unknown,
        },
        (Some(BenchmarkLabel::NoError), Some(AiResponse::NoError)) => {
            Identification::NoErrorCorrectlyIdentified
        }
        (Some(BenchmarkLabel::NoError), Some(AiResponse::Error)) => Identification::FalsePositive,
        (Some(BenchmarkLabel::Error), Some(AiResponse::Error)) => {
            Identification::ErrorCorrectlyIdentified
        }
        (Some(BenchmarkLabel::Error), Some(AiResponse::NoError)) => Identification::FalseNegative,
        (Some(_), None) => Identification::Unknown,
    }
}

/// Category correctness, only defined for correctly identified errors
pub fn classify(
    identification: Identification,
    benchmark_class: Option<ErrorClass>,
    ai_class: Option<ErrorClass>,
) -> Classification {
    match identification {
        Identification::ErrorCorrectlyIdentified if benchmark_class == ai_class => {
            Classification::Correct
        }
        Identification::ErrorCorrectlyIdentified => Classification::Incorrect,
        _ => Classification::NotApplicable,
    }
}
