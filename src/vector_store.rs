//! Request-scoped in-memory vector index

use serde_json::Value;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::doc_processor::{chunk_text, Metadata, ParsedDocument};
use crate::embedding::{search_similar, Embedder};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub content: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: EmbeddedChunk,
    pub score: f32,
}

pub struct MemoryIndex {
    chunks: Vec<EmbeddedChunk>,
    embedder: Arc<dyn Embedder>,
}

impl MemoryIndex {
    /// Embed `documents` and hold the vectors in memory.
    ///
    /// Documents with no extractable text are left out.
    pub async fn from_documents(
        documents: Vec<ParsedDocument>,
        embedder: Arc<dyn Embedder>,
        retrieval: &RetrievalConfig,
    ) -> Result<Self> {
        let (texts, metadata) = split_documents(documents, retrieval);
        if texts.is_empty() {
            return Ok(Self {
                chunks: Vec::new(),
                embedder,
            });
        }

        let vectors = embedder.embed_documents(&texts).await?;
        let chunks: Vec<EmbeddedChunk> = texts
            .into_iter()
            .zip(vectors)
            .zip(metadata)
            .map(|((content, vector), metadata)| EmbeddedChunk {
                content,
                vector,
                metadata,
            })
            .collect();

        tracing::debug!("Indexed {} chunks", chunks.len());
        Ok(Self { chunks, embedder })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks closest to `query`, best first.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed_query(query).await?;
        let ranked = search_similar(
            &query_embedding,
            self.chunks.iter().map(|c| c.vector.as_slice()),
            k,
        );
        Ok(ranked
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }
}

fn split_documents(
    documents: Vec<ParsedDocument>,
    retrieval: &RetrievalConfig,
) -> (Vec<String>, Vec<Metadata>) {
    let mut texts = Vec::new();
    let mut metadata = Vec::new();

    for doc in documents {
        if doc.text.trim().is_empty() {
            let source = doc
                .metadata
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            tracing::warn!("No text extracted from {}, leaving it out of the index", source);
            continue;
        }
        match retrieval.chunk_size {
            Some(size) => {
                for (i, chunk) in chunk_text(&doc.text, size, retrieval.chunk_overlap)
                    .into_iter()
                    .enumerate()
                {
                    let mut meta = doc.metadata.clone();
                    meta.insert("chunk".into(), Value::from(i));
                    texts.push(chunk);
                    metadata.push(meta);
                }
            }
            None => {
                texts.push(doc.text);
                metadata.push(doc.metadata);
            }
        }
    }

    (texts, metadata)
}
