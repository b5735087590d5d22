use crate::embeddings::cosine_similarity;
use crate::error::{IndexStoreError, Result};
use crate::types::{ChunkPayload, ScopeFilter, ScoredPoint, VectorSearchParams};
use async_trait::async_trait;
use std::collections::HashMap;

/// Black-box vector/keyword index. Implementations own their wire format; callers only see
/// scored points with chunk payloads.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Semantic search, best first. Points below `params.threshold` are not returned.
    async fn vector_search(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &ScopeFilter,
        params: VectorSearchParams,
    ) -> Result<Vec<ScoredPoint>>;

    /// Lexical search over chunk text, best first. Every query token must match.
    async fn text_search(
        &self,
        collection: &str,
        query: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// Unranked listing of points in scope, in storage order.
    async fn scroll(
        &self,
        collection: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;
}

#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// In-process brute-force store. Good for tests, demos and small corpora.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    collections: HashMap<String, Collection>,
}

#[derive(Debug)]
struct Collection {
    dimension: usize,
    points: Vec<StoredPoint>,
}

impl MemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, point: StoredPoint) -> Result<()> {
        let entry = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension: point.vector.len(),
                points: Vec::new(),
            });
        if point.vector.len() != entry.dimension {
            return Err(IndexStoreError::InvalidDimension {
                expected: entry.dimension,
                actual: point.vector.len(),
            });
        }
        entry.points.push(point);
        Ok(())
    }

    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |c| c.points.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|c| c.points.is_empty())
    }

    fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| IndexStoreError::UnknownCollection(name.to_string()))
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn vector_search(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &ScopeFilter,
        params: VectorSearchParams,
    ) -> Result<Vec<ScoredPoint>> {
        let collection = self.collection(collection)?;
        if embedding.len() != collection.dimension {
            return Err(IndexStoreError::InvalidDimension {
                expected: collection.dimension,
                actual: embedding.len(),
            });
        }

        let mut scored: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .filter_map(|p| {
                let score = cosine_similarity(embedding, &p.vector);
                (score >= params.threshold).then(|| ScoredPoint {
                    id: p.id.clone(),
                    score,
                    payload: p.payload.clone(),
                })
            })
            .collect();
        sort_points(&mut scored);
        scored.truncate(params.limit);
        log::debug!("vector_search: {} points", scored.len());
        Ok(scored)
    }

    async fn text_search(
        &self,
        collection: &str,
        query: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collection = self.collection(collection)?;
        let query_tokens = lexical_tokens(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .filter_map(|p| {
                let score = lexical_score(&query_tokens, &p.payload.chunk_text)?;
                Some(ScoredPoint {
                    id: p.id.clone(),
                    score,
                    payload: p.payload.clone(),
                })
            })
            .collect();
        sort_points(&mut scored);
        scored.truncate(limit);
        log::debug!("text_search '{}': {} points", query, scored.len());
        Ok(scored)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collection = self.collection(collection)?;
        Ok(collection
            .points
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .take(limit)
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: 1.0,
                payload: p.payload.clone(),
            })
            .collect())
    }
}

fn sort_points(points: &mut [ScoredPoint]) {
    points.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Lowercase word tokens. Hyphens stay inside a token, so `CO2-Steuer` does not match
/// `CO2 Steuer` (the caller's normalization fallbacks handle that).
fn lexical_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

const FULL_MATCH_SCORE: f32 = 0.6;
const REPEAT_BONUS: f32 = 0.2;

/// All query tokens must occur in the text. Score in [0.6, 1.0]: a single occurrence of every
/// token scores 0.6, each repeat adds 0.2 up to three occurrences, averaged over tokens.
/// A complete match clears the diversifier's high band (0.45) at any chunk length.
fn lexical_score(query_tokens: &[String], text: &str) -> Option<f32> {
    let text_tokens = lexical_tokens(text);
    let mut total = 0.0f32;
    for token in query_tokens {
        let tf = text_tokens.iter().filter(|t| *t == token).count();
        if tf == 0 {
            return None;
        }
        total += FULL_MATCH_SCORE + REPEAT_BONUS * (tf.min(3) - 1) as f32;
    }
    Some(total / query_tokens.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use pretty_assertions::assert_eq;

    fn point(embedder: &HashingEmbedder, doc: &str, idx: u32, text: &str) -> StoredPoint {
        StoredPoint {
            id: format!("{doc}:{idx}"),
            vector: embedder.embed_sync(text),
            payload: ChunkPayload {
                document_id: doc.to_string(),
                chunk_index: idx,
                chunk_text: text.to_string(),
                title: doc.to_uppercase(),
                url: None,
                filename: None,
                page_number: None,
                collection_id: Some("main".to_string()),
                owner_id: None,
            },
        }
    }

    fn store() -> (MemoryIndexStore, HashingEmbedder) {
        let embedder = HashingEmbedder::new(128).unwrap();
        let mut store = MemoryIndexStore::new();
        store
            .insert("chunks", point(&embedder, "a", 0, "The CO2-Steuer raises fuel prices"))
            .unwrap();
        store
            .insert("chunks", point(&embedder, "a", 1, "Fuel prices and fuel taxes"))
            .unwrap();
        store
            .insert("chunks", point(&embedder, "b", 0, "Groundwater levels are falling"))
            .unwrap();
        (store, embedder)
    }

    #[tokio::test]
    async fn text_search_requires_all_tokens() {
        let (store, _) = store();
        let filter = ScopeFilter::default();
        let hits = store
            .text_search("chunks", "fuel prices", &filter, 10)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a:0") && ids.contains(&"a:1"));

        let hits = store
            .text_search("chunks", "fuel groundwater", &filter, 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn full_match_scores_above_the_high_band_in_long_chunks() {
        let query = lexical_tokens("Grundwasser Neubildung");
        let filler = "Der Bericht beschreibt Messstellen im Umland. ".repeat(12);
        let long = format!("{filler}Die Grundwasser Neubildung sinkt. {filler}");
        let once = lexical_score(&query, &long).unwrap();
        assert!((once - 0.6).abs() < 1e-6, "{once}");

        let repeated = lexical_score(
            &query,
            "Grundwasser Grundwasser Grundwasser Neubildung Neubildung Neubildung",
        )
        .unwrap();
        assert!((repeated - 1.0).abs() < 1e-6, "{repeated}");
        assert!(lexical_score(&query, "Nur Grundwasser").is_none());
    }

    #[tokio::test]
    async fn hyphenated_tokens_do_not_match_split_words() {
        let (store, _) = store();
        let filter = ScopeFilter::default();
        let hits = store
            .text_search("chunks", "co2 steuer", &filter, 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
        let hits = store
            .text_search("chunks", "CO2-Steuer", &filter, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn vector_search_applies_threshold_and_filter() {
        let (store, embedder) = store();
        let query = embedder.embed_sync("groundwater levels");
        let all = store
            .vector_search(
                "chunks",
                &query,
                &ScopeFilter::default(),
                VectorSearchParams {
                    limit: 10,
                    threshold: 0.3,
                },
            )
            .await
            .unwrap();
        assert_eq!(all[0].id, "b:0");
        assert!(all.iter().all(|p| p.score >= 0.3));

        let scoped = store
            .vector_search(
                "chunks",
                &query,
                &ScopeFilter::for_documents(vec!["a".to_string()]),
                VectorSearchParams {
                    limit: 10,
                    threshold: 0.3,
                },
            )
            .await
            .unwrap();
        assert!(scoped.is_empty());
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let (store, _) = store();
        let err = store
            .scroll("missing", &ScopeFilter::default(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexStoreError::UnknownCollection(_)));
    }

    #[tokio::test]
    async fn scroll_respects_limit_and_order() {
        let (store, _) = store();
        let points = store.scroll("chunks", &ScopeFilter::default(), 2).await.unwrap();
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a:0", "a:1"]);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let (mut store, _) = store();
        let mut bad = point(&HashingEmbedder::new(8).unwrap(), "c", 0, "short");
        bad.id = "c:0".to_string();
        assert!(matches!(
            store.insert("chunks", bad),
            Err(IndexStoreError::InvalidDimension { .. })
        ));
    }
}
