//! Document storage abstraction.
//!
//! The [`DocumentStore`] trait covers what the retrieval engine needs from
//! the storage collaborator: a document's extracted text, and its chunk
//! list. Chunk lists are stored as immutable [`ChunkSet`] snapshots and
//! replaced wholesale, so a reader always sees either the old or the new
//! list, never a mix.
//!
//! The free functions in this module ([`ingest_document`],
//! [`rechunk_document`], [`rechunk_all`]) implement ingestion and re-chunk
//! on top of any store.

pub mod memory;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chunk::{preprocess, ChunkingOptions};
use crate::models::Chunk;

/// A document's extracted text and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with a fresh UUID.
    pub fn new(title: Option<String>, text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, text)
    }

    pub fn with_id(id: impl Into<String>, title: Option<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let now = Utc::now();
        Self {
            id: id.into(),
            title,
            content_hash: content_hash(&text),
            text,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An immutable chunk list plus the inputs it was derived from.
#[derive(Debug, Clone)]
pub struct ChunkSet {
    pub chunks: Arc<[Chunk]>,
    pub options: ChunkingOptions,
    /// Hash of the text the chunks were cut from.
    pub content_hash: String,
}

impl ChunkSet {
    /// Segment `doc` with `options`.
    pub fn build(doc: &Document, options: &ChunkingOptions) -> Self {
        Self {
            chunks: preprocess(&doc.text, options).into(),
            options: *options,
            content_hash: doc.content_hash.clone(),
        }
    }

    /// True when this set was cut from `doc`'s current text with `options`.
    pub fn is_current(&self, doc: &Document, options: &ChunkingOptions) -> bool {
        self.content_hash == doc.content_hash && self.options == *options
    }
}

/// Lightweight listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: Option<String>,
    /// Length of the extracted text in characters.
    pub text_length: usize,
    /// `None` when the document has never been chunked.
    pub chunk_count: Option<usize>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`rechunk_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RechunkReport {
    pub processed: usize,
    pub errors: usize,
    pub total: usize,
}

/// Abstract storage backend for documents and their chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put_document`](DocumentStore::put_document) | Insert or replace a document |
/// | [`get_document`](DocumentStore::get_document) | Fetch a document by ID |
/// | [`list_documents`](DocumentStore::list_documents) | List all documents |
/// | [`chunks`](DocumentStore::chunks) | Snapshot of a document's chunk list |
/// | [`replace_chunks`](DocumentStore::replace_chunks) | Atomically swap a document's chunk list |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// All documents, oldest first.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// The current chunk list, or `None` if the document was never chunked.
    async fn chunks(&self, id: &str) -> Result<Option<ChunkSet>>;

    /// Replace the whole chunk list of `id`.
    ///
    /// Implementations must make the swap atomic with respect to
    /// [`chunks`](DocumentStore::chunks).
    async fn replace_chunks(&self, id: &str, set: ChunkSet) -> Result<()>;
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store `doc` and make sure it has an up-to-date chunk list.
///
/// Segmentation is skipped when the stored chunks were cut from the same
/// text with the same options.
pub async fn ingest_document<S: DocumentStore + ?Sized>(
    store: &S,
    doc: &Document,
    options: &ChunkingOptions,
) -> Result<ChunkSet> {
    store.put_document(doc).await?;

    if let Some(existing) = store.chunks(&doc.id).await? {
        if existing.is_current(doc, options) {
            tracing::debug!(id = %doc.id, "text unchanged, keeping existing chunks");
            return Ok(existing);
        }
    }

    let set = ChunkSet::build(doc, options);
    store.replace_chunks(&doc.id, set.clone()).await?;
    tracing::info!(id = %doc.id, chunks = set.chunks.len(), "ingested document");
    Ok(set)
}

/// Regenerate the chunk list of one document from its stored text.
pub async fn rechunk_document<S: DocumentStore + ?Sized>(
    store: &S,
    id: &str,
    options: &ChunkingOptions,
) -> Result<ChunkSet> {
    let doc = store
        .get_document(id)
        .await?
        .ok_or_else(|| anyhow!("document not found: {}", id))?;
    let set = ChunkSet::build(&doc, options);
    store.replace_chunks(id, set.clone()).await?;
    tracing::info!(id, chunks = set.chunks.len(), "re-chunked document");
    Ok(set)
}

/// Re-chunk every stored document, counting failures instead of stopping.
pub async fn rechunk_all<S: DocumentStore + ?Sized>(
    store: &S,
    options: &ChunkingOptions,
) -> Result<RechunkReport> {
    let docs = store.list_documents().await?;
    let mut report = RechunkReport {
        total: docs.len(),
        ..RechunkReport::default()
    };

    for summary in &docs {
        match rechunk_document(store, &summary.id, options).await {
            Ok(_) => report.processed += 1,
            Err(e) => {
                tracing::warn!(id = %summary.id, error = %e, "re-chunk failed");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        errors = report.errors,
        total = report.total,
        "re-chunk complete"
    );
    Ok(report)
}
