//! `docqa chunk`: segment a document and print the chunks.

use anyhow::{Context, Result};
use docqa_context_core::chunk::preprocess;
use std::path::Path;

use crate::config::Config;
use crate::extract::load_document_text;

/// Segment the file at `path` with the configured chunking options.
///
/// With `json`, prints the chunk list as a JSON array (camelCase fields);
/// otherwise prints one block per chunk with its span and metadata.
pub fn run_chunk(config: &Config, path: &Path, json: bool) -> Result<()> {
    let text = load_document_text(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let options = config.chunking_options();
    options.validate()?;
    let chunks = preprocess(&text, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    if chunks.is_empty() {
        println!("No content.");
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "[chunk {}] chars {}..{} ({} chars, {} words, {} sentences{}{})",
            chunk.chunk_id,
            chunk.start_index,
            chunk.end_index,
            chunk.length,
            chunk.word_count,
            chunk.sentence_count,
            if chunk.has_numbers { ", numbers" } else { "" },
            if chunk.has_formulas { ", formulas" } else { "" },
        );
        println!("{}", chunk.text);
        println!();
    }
    println!("{} chunks", chunks.len());
    Ok(())
}
