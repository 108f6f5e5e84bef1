//! Rating-assisted relevance ranker.
//!
//! Takes the prefilter's best candidates, asks a [`Rater`] to score each
//! one, and combines the rating with the lexical score:
//!
//! ```text
//! relevance = max(ai_score, keyword_score)
//! ```
//!
//! Rating calls run with bounded concurrency. Each call is isolated: a
//! failed or unparsable reply degrades only that candidate to its keyword
//! score, so a full outage of the rating service yields pure lexical
//! ordering instead of an error.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::models::RelevanceResult;
use crate::rater::{build_rating_prompt, parse_rating, Rater, DEFAULT_EXCERPT_CHARS};

/// Reason attached to candidates whose rating call failed.
pub const AI_UNAVAILABLE_REASON: &str = "keyword matching (AI unavailable)";

/// Ranker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankOptions {
    /// Number of ranked results returned.
    pub top_k: usize,
    /// Maximum number of candidates sent to the rater.
    pub candidate_limit: usize,
    /// Maximum rating calls in flight at once.
    pub concurrency: usize,
    /// Chunk characters included in each rating prompt.
    pub excerpt_chars: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            candidate_limit: 6,
            concurrency: 2,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Rate up to `candidate_limit` candidates and return the best `top_k`.
///
/// Candidates are taken highest keyword score first. The result is sorted
/// by descending relevance; ties keep keyword order. Never fails.
pub async fn rank(
    query: &str,
    mut candidates: Vec<RelevanceResult>,
    rater: &dyn Rater,
    options: &RankOptions,
) -> Vec<RelevanceResult> {
    candidates.sort_by(|a, b| b.keyword_score.total_cmp(&a.keyword_score));
    candidates.truncate(options.candidate_limit);

    let mut ranked: Vec<RelevanceResult> = stream::iter(candidates)
        .map(|candidate| rate_candidate(query, candidate, rater, options.excerpt_chars))
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked.truncate(options.top_k);

    let rated = ranked.iter().filter(|r| r.ai_score.is_some()).count();
    tracing::debug!(
        returned = ranked.len(),
        rated,
        rater = rater.name(),
        "ranked candidates"
    );
    ranked
}

async fn rate_candidate(
    query: &str,
    mut candidate: RelevanceResult,
    rater: &dyn Rater,
    excerpt_chars: usize,
) -> RelevanceResult {
    let prompt = build_rating_prompt(query, &candidate.chunk.text, excerpt_chars);

    match rater.rate(&prompt).await {
        Ok(reply) => match parse_rating(&reply) {
            Some(rating) => {
                candidate.ai_score = Some(rating.score);
                candidate.relevance_score = rating.score.max(candidate.keyword_score);
                candidate.reason = rating.reason;
            }
            None => {
                tracing::warn!(
                    chunk_id = candidate.chunk.chunk_id,
                    rater = rater.name(),
                    "unparsable rating reply, using keyword score"
                );
                degrade(&mut candidate);
            }
        },
        Err(e) => {
            tracing::warn!(
                chunk_id = candidate.chunk.chunk_id,
                rater = rater.name(),
                error = %e,
                "rating failed, using keyword score"
            );
            degrade(&mut candidate);
        }
    }

    candidate
}

fn degrade(candidate: &mut RelevanceResult) {
    candidate.ai_score = None;
    candidate.relevance_score = candidate.keyword_score;
    candidate.reason = AI_UNAVAILABLE_REASON.to_string();
}
