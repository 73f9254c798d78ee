use super::types::{AiStep, BenchmarkStep};
use crate::error::ScoringError;
use serde_json::Value;

/// Key under which benchmark dataset exports store their step list
const BENCHMARK_LIST_KEY: &str = "dict_error_classification";

/// Key under which error-extraction responses store their step list
const AI_LIST_KEY: &str = "steps";

/// Parse a ground-truth document: a bare array or `{"dict_error_classification": [...]}`
pub fn parse_benchmark_document(doc: &Value) -> Result<Vec<BenchmarkStep>, ScoringError> {
    step_list(doc, BENCHMARK_LIST_KEY)?
        .iter()
        .map(BenchmarkStep::from_value)
        .collect()
}

/// Parse an error-extraction document: a bare array or `{"steps": [...]}`
pub fn parse_ai_document(doc: &Value) -> Result<Vec<AiStep>, ScoringError> {
    step_list(doc, AI_LIST_KEY)?
        .iter()
        .map(AiStep::from_value)
        .collect()
}

fn step_list<'a>(doc: &'a Value, key: &str) -> Result<&'a Vec<Value>, ScoringError> {
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ScoringError::InvalidDocument {
                expected: "a JSON array of steps or an object wrapping one",
            }),
        },
        _ => Err(ScoringError::InvalidDocument {
            expected: "a JSON array of steps or an object wrapping one",
        }),
    }
}
