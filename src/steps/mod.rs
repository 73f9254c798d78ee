//! Step records exchanged between the benchmark and the model output

mod document;
mod types;

pub use document::{parse_ai_document, parse_benchmark_document};
pub use types::{
    AiResponse, AiStep, BenchmarkLabel, BenchmarkStep, ErrorClass, Skill, StepNumber,
    NOT_APPLICABLE,
};
