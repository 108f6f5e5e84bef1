//! Budget-constrained context assembly.
//!
//! Packs ranked chunks into a single context string, highest relevance
//! first, each wrapped in a section marker:
//!
//! ```text
//!
//! --- Relevant Section ---
//! <chunk text>
//! ```
//!
//! Chunks are added whole while they fit. The first chunk that does not fit
//! is included as a truncated `(Partial)` section if more than
//! `min_partial_space` characters of budget remain; assembly stops there
//! either way. The resulting `context_text` never exceeds
//! `max_context_length` characters.

use serde::{Deserialize, Serialize};

use crate::models::{ContextBundle, ContextMetadata, RelevanceResult, RetrievalMethod};

const SECTION_HEADER: &str = "\n--- Relevant Section ---\n";
const PARTIAL_HEADER: &str = "\n--- Relevant Section (Partial) ---\n";
const ELLIPSIS: &str = "...";

/// Assembler budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleOptions {
    /// Hard upper bound on `context_text` length, in characters.
    pub max_context_length: usize,
    /// A partial section is only added when strictly more budget than this
    /// remains.
    pub min_partial_space: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            max_context_length: 6000,
            min_partial_space: 200,
        }
    }
}

/// Greedily pack `ranked` into a [`ContextBundle`].
///
/// `total_chunks` is the size of the chunk population the query ran
/// against and is reported unchanged in the metadata. The bundle's
/// `method` is [`RetrievalMethod::Ranked`]; callers on other paths
/// overwrite it.
pub fn assemble(
    mut ranked: Vec<RelevanceResult>,
    total_chunks: usize,
    options: &AssembleOptions,
) -> ContextBundle {
    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let section_overhead = SECTION_HEADER.chars().count() + 1;
    let partial_overhead = PARTIAL_HEADER.chars().count() + ELLIPSIS.len() + 1;

    let mut context = String::new();
    let mut used = 0usize;
    let mut selected: Vec<RelevanceResult> = Vec::new();

    for mut result in ranked {
        let block_len = section_overhead + result.chunk.text.chars().count();

        if used + block_len <= options.max_context_length {
            context.push_str(SECTION_HEADER);
            context.push_str(&result.chunk.text);
            context.push('\n');
            used += block_len;
            selected.push(result);
            continue;
        }

        let remaining = options.max_context_length - used;
        if remaining > options.min_partial_space && remaining > partial_overhead {
            let prefix: String = result
                .chunk
                .text
                .chars()
                .take(remaining - partial_overhead)
                .collect();
            context.push_str(PARTIAL_HEADER);
            context.push_str(&prefix);
            context.push_str(ELLIPSIS);
            context.push('\n');

            result.chunk.length = prefix.chars().count() + ELLIPSIS.len();
            result.chunk.text = prefix + ELLIPSIS;
            result.is_partial = true;
            selected.push(result);
        }
        break;
    }

    let context_text = context.trim().to_string();
    let average_relevance_score = if selected.is_empty() {
        0.0
    } else {
        selected.iter().map(|r| r.relevance_score).sum::<f64>() / selected.len() as f64
    };

    tracing::debug!(
        selected = selected.len(),
        context_length = context_text.chars().count(),
        max_context_length = options.max_context_length,
        "assembled context"
    );

    ContextBundle {
        metadata: ContextMetadata {
            total_chunks,
            selected_chunks: selected.len(),
            context_length: context_text.chars().count(),
            average_relevance_score,
            method: RetrievalMethod::Ranked,
            ai_scored: selected.iter().filter(|r| r.ai_score.is_some()).count(),
        },
        context_text,
        selected_chunks: selected,
    }
}
