use crate::embeddings::Embedder;
use crate::error::{IndexStoreError, Result};
use crate::store::{MemoryIndexStore, StoredPoint};
use crate::types::ChunkPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DOCUMENT_CORPUS_SCHEMA_VERSION: u32 = 1;

/// Pre-chunked documents as a JSON file, the input format for [`MemoryIndexStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCorpus {
    pub schema_version: u32,
    pub documents: Vec<CorpusDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub chunks: Vec<CorpusChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusChunk {
    pub index: u32,
    pub text: String,
    #[serde(default)]
    pub page: Option<u32>,
}

impl DocumentCorpus {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let corpus: Self = serde_json::from_slice(&bytes)?;
        if corpus.schema_version != DOCUMENT_CORPUS_SCHEMA_VERSION {
            return Err(IndexStoreError::Other(format!(
                "Unsupported document corpus schema_version {} (expected {DOCUMENT_CORPUS_SCHEMA_VERSION})",
                corpus.schema_version
            )));
        }
        corpus.validate()?;
        Ok(corpus)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                return Err(IndexStoreError::Other(
                    "document id must not be empty".to_string(),
                ));
            }
            for chunk in &doc.chunks {
                if !seen.insert((doc.id.as_str(), chunk.index)) {
                    return Err(IndexStoreError::Other(format!(
                        "duplicate chunk {} in document {}",
                        chunk.index, doc.id
                    )));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    /// Embeds every chunk and loads it into a fresh in-memory store under `collection`.
    pub async fn into_store(
        self,
        embedder: &dyn Embedder,
        collection: &str,
    ) -> Result<MemoryIndexStore> {
        let mut store = MemoryIndexStore::new();
        log::info!(
            "Embedding {} chunks from {} documents",
            self.chunk_count(),
            self.documents.len()
        );
        for doc in self.documents {
            let texts: Vec<String> = doc.chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(IndexStoreError::EmbeddingError(format!(
                    "Embedder returned {} vectors for {} chunks of {}",
                    vectors.len(),
                    texts.len(),
                    doc.id
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dimension()) {
                return Err(IndexStoreError::InvalidDimension {
                    expected: embedder.dimension(),
                    actual: bad.len(),
                });
            }
            for (chunk, vector) in doc.chunks.into_iter().zip(vectors) {
                let payload = ChunkPayload {
                    document_id: doc.id.clone(),
                    chunk_index: chunk.index,
                    chunk_text: chunk.text,
                    title: doc.title.clone(),
                    url: doc.url.clone(),
                    filename: doc.filename.clone(),
                    page_number: chunk.page,
                    collection_id: doc.collection_id.clone(),
                    owner_id: doc.owner_id.clone(),
                };
                store.insert(
                    collection,
                    StoredPoint {
                        id: format!("{}:{}", doc.id, chunk.index),
                        vector,
                        payload,
                    },
                )?;
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use tempfile::TempDir;

    const CORPUS: &str = r#"{
        "schema_version": 1,
        "documents": [
            {
                "id": "doc-1",
                "title": "Water report",
                "filename": "water.pdf",
                "chunks": [
                    {"index": 0, "text": "Groundwater levels are falling.", "page": 1},
                    {"index": 1, "text": "Rivers carry less water in summer.", "page": 2}
                ]
            }
        ]
    }"#;

    #[tokio::test]
    async fn loads_corpus_into_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        tokio::fs::write(&path, CORPUS).await.unwrap();

        let corpus = DocumentCorpus::load(&path).await.unwrap();
        assert_eq!(corpus.chunk_count(), 2);

        let embedder = HashingEmbedder::new(32).unwrap();
        let store = corpus.into_store(&embedder, "chunks").await.unwrap();
        assert_eq!(store.len("chunks"), 2);
    }

    /// Claims one dimension but produces another.
    struct MisreportingEmbedder;

    #[async_trait::async_trait]
    impl Embedder for MisreportingEmbedder {
        fn dimension(&self) -> usize {
            8
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5; 4])
        }
    }

    #[tokio::test]
    async fn rejects_vectors_of_the_wrong_dimension() {
        let corpus: DocumentCorpus = serde_json::from_str(CORPUS).unwrap();
        let err = corpus
            .into_store(&MisreportingEmbedder, "chunks")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexStoreError::InvalidDimension {
                expected: 8,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_schema_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        tokio::fs::write(&path, r#"{"schema_version": 9, "documents": []}"#)
            .await
            .unwrap();
        assert!(DocumentCorpus::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn rejects_duplicate_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        let corpus = r#"{"schema_version": 1, "documents": [
            {"id": "d", "title": "t", "chunks": [{"index": 0, "text": "a"}, {"index": 0, "text": "b"}]}
        ]}"#;
        tokio::fs::write(&path, corpus).await.unwrap();
        assert!(DocumentCorpus::load(&path).await.is_err());
    }
}
