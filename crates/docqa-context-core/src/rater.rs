//! External rating service seam.
//!
//! The ranker talks to a language model through the one-method [`Rater`]
//! trait: free-form prompt in, free-form text out. Concrete HTTP-backed
//! implementations live in the application crate; tests substitute
//! deterministic stubs.
//!
//! This module also owns the rating prompt and the tolerant parser for the
//! `"Score: <n>, Reason: <text>"` reply format.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

/// Default number of chunk characters included in a rating prompt.
pub const DEFAULT_EXCERPT_CHARS: usize = 800;

/// Reason used when the reply carries a score but no reason.
const DEFAULT_AI_REASON: &str = "AI analysis";

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)score\W*(\d+)").expect("valid score regex"));
static REASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)reason\s*:\s*(.+)").expect("valid reason regex"));

/// A text-in, text-out rating service.
///
/// Implementations must be `Send + Sync` so a single instance can serve
/// concurrent ranking calls. Errors are never surfaced to pipeline
/// callers; the ranker degrades the affected candidate instead.
#[async_trait]
pub trait Rater: Send + Sync {
    /// Short identifier used in logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Send `prompt` to the service and return its raw reply.
    async fn rate(&self, prompt: &str) -> Result<String>;
}

/// A parsed rating reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    pub reason: String,
}

/// Build the prompt asking for a 0–10 relevance rating of one chunk.
///
/// Only the first `excerpt_chars` characters of the chunk are included.
pub fn build_rating_prompt(query: &str, chunk_text: &str, excerpt_chars: usize) -> String {
    let mut excerpt: String = chunk_text.chars().take(excerpt_chars).collect();
    if chunk_text.chars().count() > excerpt_chars {
        excerpt.push_str("...");
    }
    format!(
        r#"Rate the relevance of the following text chunk to this question: "{query}"

Text chunk: "{excerpt}"

Rate from 0-10 where:
- 10: Directly answers the question or contains key information
- 7-9: Highly relevant, contains related information
- 4-6: Somewhat relevant, contains background information
- 1-3: Minimally relevant
- 0: Not relevant

Respond with only a number (0-10) and a brief reason in this format: "Score: X, Reason: brief explanation""#
    )
}

/// Parse a `"Score: <n>, Reason: <text>"` reply.
///
/// Matching is case-insensitive and tolerates surrounding chatter. Scores
/// above 10 are clamped. Returns `None` when no score can be found.
pub fn parse_rating(response: &str) -> Option<Rating> {
    let raw: u32 = SCORE_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())?;

    let reason = REASON_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('"').trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_AI_REASON.to_string());

    Some(Rating {
        score: f64::from(raw.min(10)) / 10.0,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_reply() {
        let r = parse_rating("Score: 8, Reason: Describes the refund window.").unwrap();
        assert_eq!(r.score, 0.8);
        assert_eq!(r.reason, "Describes the refund window.");
    }

    #[test]
    fn test_parse_is_case_insensitive_and_tolerant() {
        let r = parse_rating("Sure!\nSCORE: 10\nreason:   exact answer  ").unwrap();
        assert_eq!(r.score, 1.0);
        assert_eq!(r.reason, "exact answer");
    }

    #[test]
    fn test_parse_quoted_reply() {
        let r = parse_rating("\"Score: 3, Reason: only background\"").unwrap();
        assert_eq!(r.score, 0.3);
        assert_eq!(r.reason, "only background");
    }

    #[test]
    fn test_parse_markdown_emphasis() {
        let r = parse_rating("**Score:** 6, **Reason:** related").unwrap();
        assert_eq!(r.score, 0.6);
    }

    #[test]
    fn test_parse_clamps_out_of_range() {
        assert_eq!(parse_rating("Score: 42").unwrap().score, 1.0);
    }

    #[test]
    fn test_parse_missing_reason_uses_default() {
        let r = parse_rating("Score: 0").unwrap();
        assert_eq!(r.score, 0.0);
        assert_eq!(r.reason, DEFAULT_AI_REASON);
    }

    #[test]
    fn test_parse_unparsable() {
        assert_eq!(parse_rating("I think it is quite relevant."), None);
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("Score: high"), None);
    }

    #[test]
    fn test_prompt_truncates_excerpt() {
        let text = "z".repeat(1000);
        let prompt = build_rating_prompt("what is z?", &text, 800);
        assert!(prompt.contains("what is z?"));
        assert!(prompt.contains(&format!("{}...", "z".repeat(800))));
        assert!(!prompt.contains(&"z".repeat(801)));
        assert!(prompt.contains("Score: X, Reason:"));
    }

    #[test]
    fn test_prompt_keeps_short_excerpt_whole() {
        let prompt = build_rating_prompt("q", "short chunk", 800);
        assert!(prompt.contains("Text chunk: \"short chunk\""));
    }
}
