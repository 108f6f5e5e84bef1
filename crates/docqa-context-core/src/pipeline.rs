//! The staged retrieval pipeline.
//!
//! [`get_relevant_context`] runs segment → prefilter → rank → assemble for
//! one question against one document and always returns a
//! [`ContextBundle`]. Degraded conditions are reported through
//! [`ContextMetadata::method`](crate::models::ContextMetadata) and the
//! per-chunk `reason` strings rather than as errors:
//!
//! | Condition | `method` | Ranker called |
//! |-----------|----------|---------------|
//! | Empty or whitespace-only text | `no_content` | no |
//! | No chunk clears the keyword threshold | `keyword_fallback` | no |
//! | Keyword candidates found | `ranked` | yes |

use serde::{Deserialize, Serialize};

use crate::assemble::{assemble, AssembleOptions};
use crate::chunk::{preprocess, ChunkingOptions};
use crate::models::{Chunk, ContextBundle, RetrievalMethod};
use crate::prefilter::{prefilter, PrefilterOptions};
use crate::rank::{rank, RankOptions};
use crate::rater::Rater;

/// Every tuning knob of the pipeline, grouped by stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalOptions {
    pub chunking: ChunkingOptions,
    pub prefilter: PrefilterOptions,
    pub rank: RankOptions,
    pub assemble: AssembleOptions,
}

/// What the query runs against: raw text to segment now, or chunks
/// segmented earlier.
#[derive(Debug, Clone, Copy)]
pub enum ContextSource<'a> {
    Text(&'a str),
    Chunks(&'a [Chunk]),
}

/// Build the context for answering `query` from one document.
///
/// Never fails: rating errors degrade to lexical scores inside the
/// ranker, and empty documents produce an empty bundle.
pub async fn get_relevant_context(
    query: &str,
    source: ContextSource<'_>,
    options: &RetrievalOptions,
    rater: &dyn Rater,
) -> ContextBundle {
    let segmented;
    let chunks: &[Chunk] = match source {
        ContextSource::Text(text) => {
            segmented = preprocess(text, &options.chunking);
            &segmented
        }
        ContextSource::Chunks(chunks) => chunks,
    };

    if chunks.is_empty() {
        tracing::info!("document has no content, returning empty context");
        return ContextBundle::empty();
    }

    let total_chunks = chunks.len();
    let prefiltered = prefilter(query, chunks, &options.prefilter);

    let bundle = if prefiltered.fallback {
        let mut leading = prefiltered.candidates;
        leading.truncate(options.rank.top_k);
        let mut bundle = assemble(leading, total_chunks, &options.assemble);
        bundle.metadata.method = RetrievalMethod::KeywordFallback;
        bundle
    } else {
        let ranked = rank(query, prefiltered.candidates, rater, &options.rank).await;
        assemble(ranked, total_chunks, &options.assemble)
    };

    tracing::info!(
        total_chunks,
        selected = bundle.metadata.selected_chunks,
        context_length = bundle.metadata.context_length,
        method = ?bundle.metadata.method,
        "built context"
    );
    bundle
}
