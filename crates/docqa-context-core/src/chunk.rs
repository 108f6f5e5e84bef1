//! Boundary-aware sliding-window segmenter.
//!
//! Splits extracted document text into overlapping [`Chunk`]s of at most
//! `max_chunk_size` characters. Cuts prefer sentence or paragraph
//! boundaries near the end of each window so that chunks rarely stop
//! mid-sentence.
//!
//! # Algorithm
//!
//! 1. Start a window at character 0.
//! 2. The naive end is `start + max_chunk_size`, clamped to the text length.
//! 3. If the naive end is before the end of the text, search backward over
//!    the last [`BOUNDARY_SEARCH_WINDOW`] characters of the window for `.`,
//!    `?`, `!` or a paragraph break (`\n\n`), and cut just after the nearest
//!    one.
//! 4. Trim the slice and keep it unless it is empty.
//! 5. Advance `start` to `max(end - overlap, start + 1)`.
//! 6. Stop once a window reaches the end of the text.
//!
//! Offsets are character offsets, so multi-byte text is never split inside
//! a code point.
//!
//! # Example
//!
//! ```rust
//! use docqa_context_core::chunk::segment;
//!
//! let chunks = segment("Alpha. Beta. Gamma. Delta.", 10, 2);
//! assert!(chunks.len() > 1);
//! assert_eq!(chunks[0].text, "Alpha.");
//! ```

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Chunk;

/// How far back from the naive window end a boundary is searched for.
pub const BOUNDARY_SEARCH_WINDOW: usize = 200;

/// Default maximum chunk size, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 2000;

/// Default overlap between adjacent chunks, in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Segmentation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingOptions {
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingOptions {
    /// Reject options the segmenter cannot make useful progress with.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            bail!("max_chunk_size must be > 0");
        }
        if self.overlap >= self.max_chunk_size {
            bail!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap,
                self.max_chunk_size
            );
        }
        Ok(())
    }
}

/// Segment `text` and stamp every chunk with the current time.
///
/// Total function: empty or whitespace-only text yields no chunks, and any
/// `(max_chunk_size, overlap)` pair terminates. Callers are expected to keep
/// `overlap < max_chunk_size`; larger overlaps degrade to one-character
/// steps rather than looping.
pub fn segment(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    segment_at(text, max_chunk_size, overlap, Utc::now())
}

/// Run the segmenter with explicit [`ChunkingOptions`] and log the outcome.
///
/// This is the ingestion-time entry point; its output is what document
/// stores persist.
pub fn preprocess(text: &str, options: &ChunkingOptions) -> Vec<Chunk> {
    let chunks = segment(text, options.max_chunk_size, options.overlap);
    tracing::debug!(
        text_len = text.len(),
        max_chunk_size = options.max_chunk_size,
        overlap = options.overlap,
        chunks = chunks.len(),
        "segmented document"
    );
    chunks
}

/// Segment `text`, using `created_at` as every chunk's timestamp.
///
/// Fully deterministic for a fixed argument tuple.
pub fn segment_at(
    text: &str,
    max_chunk_size: usize,
    overlap: usize,
    created_at: DateTime<Utc>,
) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut last_end = 0;

    while start < len {
        let mut end = (start + max_chunk_size).min(len);

        if end < len {
            if let Some(cut) = find_boundary(&chars, start, end, last_end) {
                end = cut + 1;
            }
        }

        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(build_chunk(chunks.len(), trimmed, start, end, created_at));
        }

        if end >= len {
            break;
        }
        last_end = end;
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Find the last boundary character in `(floor, end)`.
///
/// The floor is the window start, the start of the search window, or the
/// previous chunk's end, whichever is largest. Keeping cuts past the
/// previous end makes chunk ends strictly increasing.
fn find_boundary(chars: &[char], start: usize, end: usize, last_end: usize) -> Option<usize> {
    let floor = end
        .saturating_sub(BOUNDARY_SEARCH_WINDOW)
        .max(start)
        .max(last_end.saturating_sub(1));
    (floor + 1..end).rev().find(|&i| is_boundary(chars, i))
}

fn is_boundary(chars: &[char], i: usize) -> bool {
    match chars[i] {
        '.' | '?' | '!' => true,
        '\n' => chars.get(i + 1) == Some(&'\n'),
        _ => false,
    }
}

fn build_chunk(
    chunk_id: usize,
    text: &str,
    start_index: usize,
    end_index: usize,
    created_at: DateTime<Utc>,
) -> Chunk {
    Chunk {
        chunk_id,
        text: text.to_string(),
        start_index,
        end_index,
        length: text.chars().count(),
        word_count: text.split_whitespace().count(),
        has_numbers: text.chars().any(|c| c.is_ascii_digit()),
        has_formulas: text.chars().any(|c| matches!(c, '=' | '+' | '-' | '*' | '/')),
        sentence_count: text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count(),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn covered(chunks: &[Chunk], i: usize) -> bool {
        chunks.iter().any(|c| c.start_index <= i && i < c.end_index)
    }

    #[test]
    fn test_empty_text() {
        assert!(segment("", 2000, 200).is_empty());
    }

    #[test]
    fn test_whitespace_only_text() {
        assert!(segment("   \n\n\t  ", 2000, 200).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let text = "  Hello, world! This is short.  ";
        let chunks = segment(text, 2000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text.trim());
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[0].end_index, text.chars().count());
    }

    #[test]
    fn test_text_exactly_max_size_single_chunk() {
        let text = "abcdefghij";
        let chunks = segment(text, 10, 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_cuts_at_sentence_boundaries() {
        let chunks = segment("Alpha. Beta. Gamma. Delta.", 10, 2);
        assert!(chunks.len() > 1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Alpha.", "a. Beta.", "a. Gamma.", "a. Delta."]);
        for c in &chunks {
            assert!(c.text.ends_with('.'), "chunk {:?} not cut at '.'", c.text);
            assert!(c.end_index - c.start_index <= 10);
        }
    }

    #[test]
    fn test_question_and_exclamation_boundaries() {
        let text = "Why now? Because! Then more words follow here";
        let chunks = segment(text, 20, 0);
        assert_eq!(chunks[0].text, "Why now? Because!");
    }

    #[test]
    fn test_paragraph_break_boundary() {
        let text = "first para words\n\nsecond para words and more";
        let chunks = segment(text, 24, 0);
        assert_eq!(chunks[0].text, "first para words");
        assert!(chunks[1].text.starts_with("second"));
    }

    #[test]
    fn test_no_punctuation_hard_cuts() {
        let text = "a".repeat(95);
        let chunks = segment(&text, 20, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.length <= 20);
        }
        for i in 0..95 {
            assert!(covered(&chunks, i), "index {} not covered", i);
        }
        // ceil(95 / (20 - 5)) + 1
        assert!(chunks.len() <= 8);
    }

    #[test]
    fn test_overlap_near_max_chunk_size() {
        let text = "x".repeat(30);
        let chunks = segment(&text, 10, 9);
        // One-character steps until the window reaches the end.
        assert_eq!(chunks.len(), 21);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_index, pair[0].start_index + 1);
        }
        assert_eq!(chunks.last().unwrap().end_index, 30);
    }

    #[test]
    fn test_overlap_at_or_above_max_still_terminates() {
        let text = "y".repeat(25);
        let chunks = segment(&text, 5, 5);
        assert_eq!(chunks.len(), 21);
        let chunks = segment(&text, 5, 50);
        assert_eq!(chunks.len(), 21);
    }

    #[test]
    fn test_zero_overlap_covers_whole_text() {
        let text = "word ".repeat(100);
        let chunks = segment(&text, 37, 0);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_index, pair[0].end_index);
        }
        assert_eq!(chunks.last().unwrap().end_index, text.chars().count());
    }

    #[test]
    fn test_zero_max_size_yields_nothing() {
        assert!(segment("some text", 0, 0).is_empty());
    }

    #[test]
    fn test_coverage_and_monotonic_indices() {
        let text = (0..120)
            .map(|i| {
                if i % 7 == 0 {
                    format!("Sentence {} ends here.\n\n", i)
                } else {
                    format!("clause {} continues ", i)
                }
            })
            .collect::<String>();
        let chars: Vec<char> = text.chars().collect();
        let chunks = segment(&text, 150, 40);

        for pair in chunks.windows(2) {
            assert!(pair[1].start_index >= pair[0].start_index);
            assert!(pair[1].end_index >= pair[0].end_index);
            assert!(pair[0].end_index.saturating_sub(pair[1].start_index) <= 40);
        }
        for (i, ch) in chars.iter().enumerate() {
            if !ch.is_whitespace() {
                assert!(covered(&chunks, i), "index {} not covered", i);
            }
        }
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_id, i);
            let window: String = chars[c.start_index..c.end_index].iter().collect();
            assert_eq!(window.trim(), c.text);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "One. Two? Three! Four.\n\nFive six seven. Eight nine ten.".repeat(20);
        let a = segment_at(&text, 64, 16, fixed_time());
        let b = segment_at(&text, 64, 16, fixed_time());
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "┌──────┐ Grüße aus Köln. ½ Straße! ".repeat(10);
        let chunks = segment(&text, 17, 4);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.length <= 17);
        }
    }

    #[test]
    fn test_chunk_metadata() {
        let chunks = segment("Revenue grew 12% in Q3. Profit = revenue - cost! Done?", 2000, 200);
        let c = &chunks[0];
        assert_eq!(c.word_count, 11);
        assert!(c.has_numbers);
        assert!(c.has_formulas);
        assert_eq!(c.sentence_count, 3);
        assert_eq!(c.length, c.text.chars().count());
    }

    #[test]
    fn test_plain_prose_metadata() {
        let chunks = segment("Just words here", 2000, 200);
        assert!(!chunks[0].has_numbers);
        assert!(!chunks[0].has_formulas);
        assert_eq!(chunks[0].sentence_count, 1);
    }

    #[test]
    fn test_preprocess_uses_options() {
        let options = ChunkingOptions {
            max_chunk_size: 10,
            overlap: 2,
        };
        let chunks = preprocess("Alpha. Beta. Gamma. Delta.", &options);
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_options_validation() {
        assert!(ChunkingOptions::default().validate().is_ok());
        assert!(ChunkingOptions {
            max_chunk_size: 0,
            overlap: 0
        }
        .validate()
        .is_err());
        assert!(ChunkingOptions {
            max_chunk_size: 100,
            overlap: 100
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_step_count_without_boundaries() {
        let text = "abcdefghij".repeat(100);
        for (size, overlap) in [(100, 20), (100, 0), (250, 50), (999, 998)] {
            let chunks = segment(&text, size, overlap);
            let bound = text.len().div_ceil(size - overlap) + 1;
            assert!(
                chunks.len() <= bound,
                "S={} O={}: {} chunks, bound {}",
                size,
                overlap,
                chunks.len(),
                bound
            );
            assert_eq!(chunks.last().unwrap().end_index, text.len());
        }
    }
}
