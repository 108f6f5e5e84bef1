//! `docqa stats`: chunking statistics for one document.

use anyhow::{Context, Result};
use docqa_context_core::chunk::preprocess;
use docqa_context_core::stats::chunk_stats;
use std::path::Path;

use crate::config::Config;
use crate::extract::load_document_text;

/// Chunk the file at `path` and print a size summary.
pub fn run_stats(config: &Config, path: &Path) -> Result<()> {
    let text = load_document_text(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let options = config.chunking_options();
    options.validate()?;
    let stats = chunk_stats(&preprocess(&text, &options));

    println!("docqa chunk stats");
    println!("=================");
    println!();
    println!("  Document:    {}", path.display());
    println!("  Text:        {} chars", text.chars().count());
    println!(
        "  Chunking:    max {} / overlap {}",
        options.max_chunk_size, options.overlap
    );
    println!();
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Average:     {:.1} chars", stats.average_chunk_size);
    println!("  Total:       {} chars", stats.total_text_length);
    println!();
    println!("  By size:");
    println!("    small  (<1000)      {:>6}", stats.size_distribution.small);
    println!("    medium (1000-2000)  {:>6}", stats.size_distribution.medium);
    println!("    large  (>2000)      {:>6}", stats.size_distribution.large);
    println!();
    Ok(())
}
