use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which rating responses store their section list
const SECTIONS_KEY: &str = "sections";

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

/// Rubric ratings for one section of a generated protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRating {
    pub section: String,
    #[serde(default)]
    pub ground_truth_text: String,
    #[serde(default)]
    pub ai_generated_text: String,
    pub completeness_rating: i64,
    #[serde(default)]
    pub completeness_explanation: String,
    pub technical_accuracy_rating: i64,
    #[serde(default)]
    pub technical_accuracy_explanation: String,
    pub logical_flow_rating: i64,
    #[serde(default)]
    pub logical_flow_explanation: String,
    pub safety_rating: i64,
    #[serde(default)]
    pub safety_explanation: String,
    pub formatting_rating: i64,
    #[serde(default)]
    pub formatting_explanation: String,
    #[serde(default)]
    pub notes: String,
}

impl SectionRating {
    fn ratings(&self) -> [(&'static str, i64); 5] {
        [
            ("completeness_rating", self.completeness_rating),
            ("technical_accuracy_rating", self.technical_accuracy_rating),
            ("logical_flow_rating", self.logical_flow_rating),
            ("safety_rating", self.safety_rating),
            ("formatting_rating", self.formatting_rating),
        ]
    }

    fn validate(&self) -> Result<(), ScoringError> {
        for (field, value) in self.ratings() {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(ScoringError::RatingOutOfRange {
                    field,
                    value,
                    section: self.section.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse a rating document: a bare array of sections or `{"sections": [...]}`
pub fn parse_rating_document(doc: &Value) -> Result<Vec<SectionRating>, ScoringError> {
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(SECTIONS_KEY) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ScoringError::InvalidDocument {
                    expected: "a JSON array of rated sections or an object wrapping one",
                })
            }
        },
        _ => {
            return Err(ScoringError::InvalidDocument {
                expected: "a JSON array of rated sections or an object wrapping one",
            })
        }
    };

    items
        .iter()
        .map(|item| {
            let section: SectionRating =
                serde_json::from_value(item.clone()).map_err(|e| ScoringError::MalformedRating {
                    reason: e.to_string(),
                    record: item.to_string(),
                })?;
            section.validate()?;
            Ok(section)
        })
        .collect()
}

/// Mean rubric ratings for one protocol, or the mean over several protocols
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    #[serde(rename = "Completeness")]
    pub completeness: f64,
    #[serde(rename = "Technical Accuracy")]
    pub technical_accuracy: f64,
    #[serde(rename = "Logical Flow")]
    pub logical_flow: f64,
    #[serde(rename = "Safety")]
    pub safety: f64,
    #[serde(rename = "Formatting")]
    pub formatting: f64,
    /// Mean of the five criteria
    #[serde(rename = "Overall")]
    pub overall: f64,
}

impl RatingSummary {
    /// Per-criterion means over the rated sections
    pub fn from_sections(sections: &[SectionRating]) -> Result<Self, ScoringError> {
        if sections.is_empty() {
            return Err(ScoringError::InvalidDocument {
                expected: "at least one rated section",
            });
        }
        let n = sections.len() as f64;
        let mean = |f: fn(&SectionRating) -> i64| sections.iter().map(|s| f(s) as f64).sum::<f64>() / n;

        let completeness = mean(|s| s.completeness_rating);
        let technical_accuracy = mean(|s| s.technical_accuracy_rating);
        let logical_flow = mean(|s| s.logical_flow_rating);
        let safety = mean(|s| s.safety_rating);
        let formatting = mean(|s| s.formatting_rating);

        Ok(Self {
            completeness,
            technical_accuracy,
            logical_flow,
            safety,
            formatting,
            overall: (completeness + technical_accuracy + logical_flow + safety + formatting) / 5.0,
        })
    }

    /// Column means across runs; `None` when there are no runs
    pub fn mean(runs: &[&RatingSummary]) -> Option<Self> {
        if runs.is_empty() {
            return None;
        }
        let n = runs.len() as f64;
        let mean = |f: fn(&RatingSummary) -> f64| runs.iter().map(|r| f(r)).sum::<f64>() / n;

        Some(Self {
            completeness: mean(|r| r.completeness),
            technical_accuracy: mean(|r| r.technical_accuracy),
            logical_flow: mean(|r| r.logical_flow),
            safety: mean(|r| r.safety),
            formatting: mean(|r| r.formatting),
            overall: mean(|r| r.overall),
        })
    }

    pub const CRITERIA: [&'static str; 6] = [
        "Completeness",
        "Technical Accuracy",
        "Logical Flow",
        "Safety",
        "Formatting",
        "Overall",
    ];

    /// Criterion name and value, in reporting order
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            (Self::CRITERIA[0], self.completeness),
            (Self::CRITERIA[1], self.technical_accuracy),
            (Self::CRITERIA[2], self.logical_flow),
            (Self::CRITERIA[3], self.safety),
            (Self::CRITERIA[4], self.formatting),
            (Self::CRITERIA[5], self.overall),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(name: &str, ratings: [i64; 5]) -> Value {
        json!({
            "section": name,
            "completeness_rating": ratings[0],
            "technical_accuracy_rating": ratings[1],
            "logical_flow_rating": ratings[2],
            "safety_rating": ratings[3],
            "formatting_rating": ratings[4],
        })
    }

    #[test]
    fn test_criterion_means_and_overall() {
        let doc = json!({"sections": [
            section("Title", [5, 4, 3, 5, 4]),
            section("Procedure - Step 1", [3, 4, 5, 5, 2]),
        ]});
        let sections = parse_rating_document(&doc).unwrap();
        let summary = RatingSummary::from_sections(&sections).unwrap();

        assert_eq!(summary.completeness, 4.0);
        assert_eq!(summary.technical_accuracy, 4.0);
        assert_eq!(summary.logical_flow, 4.0);
        assert_eq!(summary.safety, 5.0);
        assert_eq!(summary.formatting, 3.0);
        assert_eq!(summary.overall, 4.0);
    }

    #[test]
    fn test_out_of_range_rating_rejected() {
        let doc = json!([section("Abstract", [5, 0, 3, 5, 4])]);
        let err = parse_rating_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::RatingOutOfRange {
                field: "technical_accuracy_rating",
                value: 0,
                ..
            }
        ));

        let doc = json!([section("Abstract", [6, 3, 3, 5, 4])]);
        assert!(parse_rating_document(&doc).is_err());
    }

    #[test]
    fn test_missing_or_fractional_rating_is_malformed() {
        let err = parse_rating_document(&json!([{"section": "Title", "completeness_rating": 4}]))
            .unwrap_err();
        assert!(matches!(err, ScoringError::MalformedRating { .. }));

        let mut fractional = section("Title", [4, 4, 4, 4, 4]);
        fractional["safety_rating"] = json!(4.5);
        assert!(matches!(
            parse_rating_document(&json!([fractional])).unwrap_err(),
            ScoringError::MalformedRating { .. }
        ));
    }

    #[test]
    fn test_empty_sections_rejected() {
        let sections = parse_rating_document(&json!({"sections": []})).unwrap();
        assert!(RatingSummary::from_sections(&sections).is_err());
        assert!(parse_rating_document(&json!("nope")).is_err());
    }

    #[test]
    fn test_mean_across_runs() {
        let a = RatingSummary::from_sections(
            &parse_rating_document(&json!([section("Title", [5, 5, 5, 5, 5])])).unwrap(),
        )
        .unwrap();
        let b = RatingSummary::from_sections(
            &parse_rating_document(&json!([section("Title", [3, 3, 3, 3, 3])])).unwrap(),
        )
        .unwrap();

        let all = RatingSummary::mean(&[&a, &b]).unwrap();
        assert_eq!(all.completeness, 4.0);
        assert_eq!(all.overall, 4.0);
        assert!(RatingSummary::mean(&[]).is_none());

        let value = serde_json::to_value(all).unwrap();
        assert_eq!(value["Technical Accuracy"], json!(4.0));
        assert_eq!(all.named()[5], ("Overall", 4.0));
    }
}
