//! In-memory [`DocumentStore`] for tests, the HTTP server, and WASM targets.
//!
//! Documents and chunk sets live in two `HashMap`s behind
//! `std::sync::RwLock`. A chunk set is an `Arc<[Chunk]>`, so replacing it is
//! a single map insert under the write lock and readers keep whatever
//! snapshot they already cloned.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{ChunkSet, Document, DocumentStore, DocumentSummary};

pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<HashMap<String, ChunkSet>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| anyhow!("document store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| anyhow!("document store lock poisoned"))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put_document(&self, doc: &Document) -> Result<()> {
        let mut docs = write(&self.docs)?;
        let mut doc = doc.clone();
        if let Some(existing) = docs.get(&doc.id) {
            doc.created_at = existing.created_at;
        }
        docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(read(&self.docs)?.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let docs = read(&self.docs)?;
        let chunks = read(&self.chunks)?;
        let mut ordered: Vec<&Document> = docs.values().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(ordered
            .into_iter()
            .map(|d| DocumentSummary {
                id: d.id.clone(),
                title: d.title.clone(),
                text_length: d.text.chars().count(),
                chunk_count: chunks.get(&d.id).map(|s| s.chunks.len()),
                updated_at: d.updated_at,
            })
            .collect())
    }

    async fn chunks(&self, id: &str) -> Result<Option<ChunkSet>> {
        Ok(read(&self.chunks)?.get(id).cloned())
    }

    async fn replace_chunks(&self, id: &str, set: ChunkSet) -> Result<()> {
        if !read(&self.docs)?.contains_key(id) {
            return Err(anyhow!("document not found: {}", id));
        }
        write(&self.chunks)?.insert(id.to_string(), set);
        Ok(())
    }
}
