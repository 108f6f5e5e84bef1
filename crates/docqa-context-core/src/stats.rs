//! Chunking statistics for a single document.
//!
//! A quick summary of how a document was segmented: chunk count, average
//! chunk size, and a small/medium/large size histogram. Used by
//! `docqa stats` and the `/documents/{id}/stats` endpoint to check that a
//! re-chunk produced sensible output.

use serde::Serialize;

use crate::models::Chunk;

/// Chunks shorter than this many characters count as small.
pub const SMALL_CHUNK_LIMIT: usize = 1000;
/// Chunks longer than this many characters count as large.
pub const LARGE_CHUNK_LIMIT: usize = 2000;

/// Chunk count per size bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeDistribution {
    /// Fewer than 1000 characters.
    pub small: usize,
    /// 1000 to 2000 characters inclusive.
    pub medium: usize,
    /// More than 2000 characters.
    pub large: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub average_chunk_size: f64,
    /// Sum of chunk lengths; overlap is counted once per chunk.
    pub total_text_length: usize,
    pub size_distribution: SizeDistribution,
}

pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
    let total_text_length: usize = chunks.iter().map(|c| c.length).sum();
    let mut size_distribution = SizeDistribution::default();
    for c in chunks {
        match c.length {
            n if n < SMALL_CHUNK_LIMIT => size_distribution.small += 1,
            n if n <= LARGE_CHUNK_LIMIT => size_distribution.medium += 1,
            _ => size_distribution.large += 1,
        }
    }

    ChunkStats {
        total_chunks: chunks.len(),
        average_chunk_size: if chunks.is_empty() {
            0.0
        } else {
            total_text_length as f64 / chunks.len() as f64
        },
        total_text_length,
        size_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::segment;

    #[test]
    fn test_empty() {
        let stats = chunk_stats(&[]);
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.average_chunk_size, 0.0);
        assert_eq!(stats.size_distribution, SizeDistribution::default());
    }

    #[test]
    fn test_buckets() {
        let mut chunks = segment(&"s".repeat(999), 5000, 0);
        chunks.extend(segment(&"m".repeat(1000), 5000, 0));
        chunks.extend(segment(&"m".repeat(2000), 5000, 0));
        chunks.extend(segment(&"l".repeat(2001), 5000, 0));

        let stats = chunk_stats(&chunks);
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.total_text_length, 6000);
        assert_eq!(stats.average_chunk_size, 1500.0);
        assert_eq!(
            stats.size_distribution,
            SizeDistribution {
                small: 1,
                medium: 2,
                large: 1
            }
        );
    }
}
