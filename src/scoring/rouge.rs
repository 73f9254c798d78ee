//! ROUGE-1 scoring of protocol titles.
//!
//! Titles are compared on unigram overlap after lowercasing, splitting on
//! anything that is not an ASCII letter or digit, and stemming tokens longer
//! than three characters.

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Tokens this short are compared verbatim
const MIN_STEM_LEN: usize = 4;

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern compiles"));

static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("static pattern compiles"));

static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("static pattern compiles"));

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_ALNUM
        .split(&lowered)
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.len() >= MIN_STEM_LEN {
                STEMMER.stem(t).into_owned()
            } else {
                t.to_string()
            }
        })
        .collect()
}

/// ROUGE-1 F-measure between a reference and a candidate
pub fn rouge1_fmeasure(reference: &str, candidate: &str) -> f64 {
    let reference = tokenize(reference);
    let candidate = tokenize(candidate);
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for token in &reference {
        *ref_counts.entry(token.as_str()).or_default() += 1;
    }
    let mut cand_counts: HashMap<&str, usize> = HashMap::new();
    for token in &candidate {
        *cand_counts.entry(token.as_str()).or_default() += 1;
    }

    let overlap: usize = cand_counts
        .iter()
        .map(|(token, n)| (*n).min(ref_counts.get(token).copied().unwrap_or(0)))
        .sum();
    if overlap == 0 {
        return 0.0;
    }

    let precision = overlap as f64 / candidate.len() as f64;
    let recall = overlap as f64 / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Best score over every candidate/reference pair; 0 when either side is empty
pub fn best_rouge1(candidates: &[String], references: &[String]) -> f64 {
    candidates
        .iter()
        .filter(|c| !c.is_empty())
        .flat_map(|c| {
            references
                .iter()
                .filter(|r| !r.is_empty())
                .map(move |r| rouge1_fmeasure(r, c))
        })
        .fold(0.0, f64::max)
}

/// Split an expected-title field; comma-separated lists name alternatives
pub fn expected_titles(reference: &str) -> Vec<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Vec::new();
    }
    if !reference.contains(',') {
        return vec![reference.to_string()];
    }
    reference
        .split(',')
        .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Quoted titles in a free-text response, double quotes first.
///
/// A response that quotes nothing names no title.
pub fn candidate_titles(response: &str) -> Vec<String> {
    DOUBLE_QUOTED
        .captures_iter(response)
        .chain(SINGLE_QUOTED.captures_iter(response))
        .map(|c| c[1].to_string())
        .collect()
}
