//! End-to-end retrieval through the library API with stub raters.

use anyhow::{bail, Result};
use async_trait::async_trait;
use docqa_context::config::Config;
use docqa_context_core::chunk::ChunkingOptions;
use docqa_context_core::models::RetrievalMethod;
use docqa_context_core::pipeline::{get_relevant_context, ContextSource, RetrievalOptions};
use docqa_context_core::rater::Rater;
use docqa_context_core::store::memory::InMemoryDocumentStore;
use docqa_context_core::store::{ingest_document, rechunk_document, Document, DocumentStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scores by how many times "invoice" appears in the excerpt; tracks
/// concurrent calls.
struct InvoiceRater {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl InvoiceRater {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Rater for InvoiceRater {
    fn name(&self) -> &str {
        "invoice-stub"
    }

    async fn rate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let excerpt = prompt.split("Text chunk:").nth(1).unwrap_or_default();
        let hits = excerpt.matches("invoice").count().min(10);
        Ok(format!("Score: {}, Reason: mentions invoice {} times", hits, hits))
    }
}

struct GibberishRater;

#[async_trait]
impl Rater for GibberishRater {
    fn name(&self) -> &str {
        "gibberish"
    }

    async fn rate(&self, _prompt: &str) -> Result<String> {
        Ok("I would rather not say.".to_string())
    }
}

struct DownRater;

#[async_trait]
impl Rater for DownRater {
    fn name(&self) -> &str {
        "down"
    }

    async fn rate(&self, _prompt: &str) -> Result<String> {
        bail!("connection refused")
    }
}

fn ledger() -> String {
    let mut text = String::new();
    for i in 0..40 {
        let invoices = " invoice".repeat(i % 7);
        text.push_str(&format!(
            "Paragraph {} about billing and the payment ledger.{}.\n\n",
            i, invoices
        ));
    }
    text
}

fn options() -> RetrievalOptions {
    let mut options = RetrievalOptions::default();
    options.chunking = ChunkingOptions {
        max_chunk_size: 150,
        overlap: 20,
    };
    options
}

#[tokio::test]
async fn test_rated_pipeline_bounds_concurrency() {
    let rater = InvoiceRater::new();
    let text = ledger();
    let bundle = get_relevant_context(
        "billing invoice",
        ContextSource::Text(&text),
        &options(),
        &rater,
    )
    .await;

    assert_eq!(bundle.metadata.method, RetrievalMethod::Ranked);
    assert_eq!(rater.calls.load(Ordering::SeqCst), 6);
    assert!(rater.peak.load(Ordering::SeqCst) <= 2);
    assert!(bundle.metadata.selected_chunks <= 3);
    assert!(bundle.metadata.ai_scored >= 1);

    let scores: Vec<f64> = bundle
        .selected_chunks
        .iter()
        .map(|r| r.relevance_score)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    for r in &bundle.selected_chunks {
        assert!((0.0..=1.0).contains(&r.relevance_score));
        assert!(r.relevance_score >= r.keyword_score);
    }
}

#[tokio::test]
async fn test_unparsable_replies_degrade_to_keywords() {
    let text = ledger();
    let bundle = get_relevant_context(
        "billing invoice",
        ContextSource::Text(&text),
        &options(),
        &GibberishRater,
    )
    .await;

    assert_eq!(bundle.metadata.ai_scored, 0);
    for r in &bundle.selected_chunks {
        assert_eq!(r.ai_score, None);
        assert_eq!(r.relevance_score, r.keyword_score);
        assert_eq!(r.reason, "keyword matching (AI unavailable)");
    }
}

#[tokio::test]
async fn test_outage_matches_keyword_order() {
    let text = ledger();
    let bundle = get_relevant_context(
        "billing invoice",
        ContextSource::Text(&text),
        &options(),
        &DownRater,
    )
    .await;

    assert_eq!(bundle.metadata.method, RetrievalMethod::Ranked);
    assert!(bundle.metadata.selected_chunks >= 1);
    assert!(bundle.metadata.context_length <= 6000);
    let keyword: Vec<f64> = bundle.selected_chunks.iter().map(|r| r.keyword_score).collect();
    assert!(keyword.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_same_input_same_output() {
    let text = ledger();
    let a = get_relevant_context("payment ledger", ContextSource::Text(&text), &options(), &DownRater).await;
    let b = get_relevant_context("payment ledger", ContextSource::Text(&text), &options(), &DownRater).await;

    assert_eq!(a.context_text, b.context_text);
    assert_eq!(a.metadata, b.metadata);
    let ids = |bundle: &docqa_context_core::models::ContextBundle| {
        bundle
            .selected_chunks
            .iter()
            .map(|r| r.chunk.chunk_id)
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
}

#[tokio::test]
async fn test_rechunk_changes_what_queries_see() {
    let store = InMemoryDocumentStore::new();
    let doc = Document::new(Some("ledger".into()), ledger());
    let small = ChunkingOptions {
        max_chunk_size: 150,
        overlap: 20,
    };
    let large = ChunkingOptions {
        max_chunk_size: 1500,
        overlap: 100,
    };

    ingest_document(&store, &doc, &small).await.unwrap();
    let before = store.chunks(&doc.id).await.unwrap().unwrap();
    let bundle = get_relevant_context(
        "invoice",
        ContextSource::Chunks(&before.chunks),
        &options(),
        &DownRater,
    )
    .await;
    assert_eq!(bundle.metadata.total_chunks, before.chunks.len());

    rechunk_document(&store, &doc.id, &large).await.unwrap();
    let after = store.chunks(&doc.id).await.unwrap().unwrap();
    assert!(after.chunks.len() < before.chunks.len());
    let bundle = get_relevant_context(
        "invoice",
        ContextSource::Chunks(&after.chunks),
        &options(),
        &DownRater,
    )
    .await;
    assert_eq!(bundle.metadata.total_chunks, after.chunks.len());
}

#[tokio::test]
async fn test_config_drives_pipeline() {
    let mut config = Config::minimal();
    config.retrieval.top_k = 1;
    config.retrieval.max_context_length = 250;
    config.chunking.max_chunk_size = 150;
    config.chunking.overlap = 20;

    let text = ledger();
    let bundle = get_relevant_context(
        "billing",
        ContextSource::Text(&text),
        &config.retrieval_options(),
        &DownRater,
    )
    .await;
    assert_eq!(bundle.metadata.selected_chunks, 1);
    assert!(bundle.metadata.context_length <= 250);
}
