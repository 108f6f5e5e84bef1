//! `docqa context`: build the context for one question against one file.

use anyhow::{Context, Result};
use docqa_context_core::pipeline::{get_relevant_context, ContextSource};
use std::path::Path;

use crate::config::Config;
use crate::extract::load_document_text;
use crate::rater::create_rater;

/// Run the retrieval pipeline over the file at `path` and print the bundle.
///
/// `top_k` and `max_context_length` override the `[retrieval]` section.
pub async fn run_context(
    config: &Config,
    path: &Path,
    query: &str,
    top_k: Option<usize>,
    max_context_length: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }

    let text = load_document_text(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let mut options = config.retrieval_options();
    if let Some(k) = top_k {
        options.rank.top_k = k.max(1);
    }
    if let Some(max) = max_context_length {
        options.assemble.max_context_length = max;
    }
    options.chunking.validate()?;

    let rater = create_rater(&config.rater)?;
    let bundle =
        get_relevant_context(query, ContextSource::Text(&text), &options, rater.as_ref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    let meta = &bundle.metadata;
    println!(
        "{} of {} chunks selected ({} chars, avg relevance {:.2}, method {})",
        meta.selected_chunks,
        meta.total_chunks,
        meta.context_length,
        meta.average_relevance_score,
        meta.method.as_str(),
    );
    for r in &bundle.selected_chunks {
        println!(
            "  chunk {:>4}  relevance {:.2}  keyword {:.2}  ai {}  {}{}",
            r.chunk.chunk_id,
            r.relevance_score,
            r.keyword_score,
            r.ai_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string()),
            r.reason,
            if r.is_partial { " (partial)" } else { "" },
        );
    }
    println!();
    println!("{}", bundle.context_text);
    Ok(())
}
