//! Core data models that flow through the retrieval pipeline.
//!
//! [`Chunk`]s are produced once per document by the segmenter and persisted
//! by the document store. [`RelevanceResult`] and [`ContextBundle`] are
//! ephemeral: they are built fresh for every query and handed straight back
//! to the caller.
//!
//! All types serialize with camelCase field names so the HTTP layer can
//! return them unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous slice of a document's text.
///
/// `start_index` and `end_index` delimit the raw window the segmenter cut
/// (in characters, end exclusive); `text` is that window with surrounding
/// whitespace trimmed, so `length` may be smaller than
/// `end_index - start_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 0-based position of the chunk within its document.
    pub chunk_id: usize,
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    /// Length of `text` in characters.
    pub length: usize,
    pub word_count: usize,
    pub has_numbers: bool,
    pub has_formulas: bool,
    pub sentence_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A chunk scored against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceResult {
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Fraction of query words found in the chunk, in `[0, 1]`.
    pub keyword_score: f64,
    /// Rating-service score in `[0, 1]`, or `None` when the chunk was not
    /// rated or rating failed.
    pub ai_score: Option<f64>,
    /// Final score in `[0, 1]` used for ordering.
    pub relevance_score: f64,
    pub reason: String,
    /// Set by the assembler when only a prefix of the chunk was included.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_partial: bool,
}

impl RelevanceResult {
    /// Wrap a chunk with a lexical score only.
    pub fn from_keyword(chunk: Chunk, keyword_score: f64, reason: impl Into<String>) -> Self {
        let keyword_score = keyword_score.clamp(0.0, 1.0);
        Self {
            chunk,
            keyword_score,
            ai_score: None,
            relevance_score: keyword_score,
            reason: reason.into(),
            is_partial: false,
        }
    }
}

/// How the selected chunks of a [`ContextBundle`] were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// The document had no non-whitespace text.
    NoContent,
    /// No chunk passed the keyword threshold; leading chunks were used.
    KeywordFallback,
    /// Keyword candidates went through the ranker (rated or degraded).
    Ranked,
}

impl RetrievalMethod {
    /// The serialized name, e.g. `"keyword_fallback"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::NoContent => "no_content",
            RetrievalMethod::KeywordFallback => "keyword_fallback",
            RetrievalMethod::Ranked => "ranked",
        }
    }
}

/// Summary numbers describing a [`ContextBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Size of the whole chunk population the query was run against.
    pub total_chunks: usize,
    pub selected_chunks: usize,
    /// Length of `context_text` in characters.
    pub context_length: usize,
    pub average_relevance_score: f64,
    pub method: RetrievalMethod,
    /// Number of selected chunks that carry a rating-service score.
    pub ai_scored: usize,
}

/// The length-bounded context handed to the question-answering step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBundle {
    pub context_text: String,
    pub selected_chunks: Vec<RelevanceResult>,
    pub metadata: ContextMetadata,
}

impl ContextBundle {
    /// The bundle returned for a document with no usable text.
    pub fn empty() -> Self {
        Self {
            context_text: String::new(),
            selected_chunks: Vec::new(),
            metadata: ContextMetadata {
                total_chunks: 0,
                selected_chunks: 0,
                context_length: 0,
                average_relevance_score: 0.0,
                method: RetrievalMethod::NoContent,
                ai_scored: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::segment;

    #[test]
    fn test_relevance_result_wire_format() {
        let chunk = segment("Refunds take 30 days.", 100, 0).remove(0);
        let mut result = RelevanceResult::from_keyword(chunk, 1.5, "keyword match");
        let json = serde_json::to_value(&result).unwrap();

        // Chunk fields are flattened alongside the scores.
        assert_eq!(json["chunkId"], 0);
        assert_eq!(json["text"], "Refunds take 30 days.");
        assert_eq!(json["hasNumbers"], true);
        assert_eq!(json["keywordScore"], 1.0);
        assert_eq!(json["relevanceScore"], 1.0);
        assert!(json["aiScore"].is_null());
        assert!(json.get("isPartial").is_none());

        result.is_partial = true;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isPartial"], true);

        let back: RelevanceResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_empty_bundle_metadata() {
        let json = serde_json::to_value(ContextBundle::empty()).unwrap();
        assert_eq!(json["contextText"], "");
        assert_eq!(json["metadata"]["method"], "no_content");
        assert_eq!(json["metadata"]["totalChunks"], 0);
        assert_eq!(
            RetrievalMethod::KeywordFallback.as_str(),
            serde_json::to_value(RetrievalMethod::KeywordFallback).unwrap()
        );
    }
}
