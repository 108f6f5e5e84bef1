//! Cheap lexical prefilter.
//!
//! Scores every chunk by the fraction of query words it contains and keeps
//! the best few as candidates for the (expensive) ranker. Matching is by
//! substring in either direction, so `"refund"` matches `"refunds"` and
//! `"payments"` matches `"pay"`.
//!
//! When nothing clears the threshold the prefilter falls back to the
//! leading chunks of the document, so later stages always have something
//! to work with.

use serde::{Deserialize, Serialize};

use crate::models::{Chunk, RelevanceResult};

/// Minimum character length for a token to take part in matching.
const MIN_TOKEN_CHARS: usize = 3;

/// Keyword score assigned to fallback candidates.
pub const FALLBACK_SCORE: f64 = 0.1;

/// Reason attached to fallback candidates.
pub const FALLBACK_REASON: &str = "fallback - no keyword matches";

/// Reason attached to candidates that passed the keyword threshold.
pub const KEYWORD_REASON: &str = "keyword match";

/// Prefilter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefilterOptions {
    /// Chunks must score strictly above this to be kept.
    pub threshold: f64,
    /// Maximum number of candidates returned.
    pub top_n: usize,
}

impl Default for PrefilterOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            top_n: 10,
        }
    }
}

/// Result of a prefilter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefiltered {
    pub candidates: Vec<RelevanceResult>,
    /// True when no chunk cleared the threshold and the leading chunks
    /// were returned instead.
    pub fallback: bool,
}

/// Lowercase words of at least three characters.
///
/// Words are maximal runs of alphanumeric characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query words with a substring match among the text's words.
///
/// Returns 0.0 when the query has no usable words.
pub fn keyword_score(query_words: &[String], text: &str) -> f64 {
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words = tokenize(text);
    let matched = query_words
        .iter()
        .filter(|q| {
            text_words
                .iter()
                .any(|t| t.contains(q.as_str()) || q.contains(t.as_str()))
        })
        .count();
    matched as f64 / query_words.len() as f64
}

/// Score all chunks against `query` and keep the best `options.top_n`.
///
/// Candidates are sorted by descending keyword score; equal scores keep
/// document order.
pub fn prefilter(query: &str, chunks: &[Chunk], options: &PrefilterOptions) -> Prefiltered {
    let query_words = tokenize(query);

    let mut scored: Vec<RelevanceResult> = chunks
        .iter()
        .filter_map(|chunk| {
            let score = keyword_score(&query_words, &chunk.text);
            (score > options.threshold)
                .then(|| RelevanceResult::from_keyword(chunk.clone(), score, KEYWORD_REASON))
        })
        .collect();

    if scored.is_empty() {
        tracing::debug!(
            query_words = query_words.len(),
            chunks = chunks.len(),
            "no keyword matches, falling back to leading chunks"
        );
        let candidates = chunks
            .iter()
            .take(options.top_n)
            .map(|chunk| RelevanceResult::from_keyword(chunk.clone(), FALLBACK_SCORE, FALLBACK_REASON))
            .collect();
        return Prefiltered {
            candidates,
            fallback: true,
        };
    }

    scored.sort_by(|a, b| b.keyword_score.total_cmp(&a.keyword_score));
    scored.truncate(options.top_n);
    tracing::debug!(
        candidates = scored.len(),
        chunks = chunks.len(),
        "keyword prefilter kept candidates"
    );

    Prefiltered {
        candidates: scored,
        fallback: false,
    }
}
