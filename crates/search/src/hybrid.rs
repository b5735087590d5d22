use crate::candidate::{group_by_document, DocumentHit, ScoredCandidate};
use crate::config::{FusionConfig, QualityGateConfig, RetrievalConfig};
use crate::error::{Result, SearchError};
use crate::fusion::Fusion;
use crate::normalization::{dehyphenate, fallback_tokens, fold_umlauts, TextRecallStage};
use crate::weighting::weights_for;
use citeseek_index_store::{IndexStore, ScopeFilter, ScoredPoint, VectorSearchParams};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one hybrid search, with the signals that shaped it.
#[derive(Debug, Clone)]
pub struct HybridOutcome {
    pub hits: Vec<DocumentHit>,
    pub text_hit_count: usize,
    pub vector_hit_count: usize,
    /// Similarity threshold the vector hits were held to.
    pub threshold: f32,
    pub text_stage: TextRecallStage,
}

impl HybridOutcome {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Semantic + lexical search over one collection with rank fusion and quality gating.
pub struct HybridSearch {
    store: Arc<dyn IndexStore>,
    collection: String,
    retrieval: RetrievalConfig,
    fusion: Fusion,
    gate: QualityGateConfig,
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn IndexStore>,
        collection: impl Into<String>,
        retrieval: RetrievalConfig,
        fusion: &FusionConfig,
        gate: QualityGateConfig,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            retrieval,
            fusion: Fusion::from_config(fusion),
            gate,
        }
    }

    #[must_use]
    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Search with the full hybrid strategy: text recall with fallbacks, dynamic-threshold
    /// vector recall, fusion, quality gate, document grouping.
    pub async fn search(
        &self,
        query: &str,
        embedding: &[f32],
        filter: &ScopeFilter,
    ) -> Result<HybridOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        log::debug!("Hybrid search: query='{}'", query);

        // The vector call cannot wait for the text count, so it runs at the looser threshold
        // and is tightened below once the count is known. Recall is score-ordered, so this
        // returns the same set as a sequential call at the final threshold.
        let loose = self
            .retrieval
            .threshold(true)
            .min(self.retrieval.threshold(false));
        let vector_params = VectorSearchParams {
            limit: self.retrieval.vector_limit(),
            threshold: loose,
        };
        let (text_recall, vector_hits) = tokio::try_join!(
            self.text_recall(query, filter),
            async {
                self.store
                    .vector_search(&self.collection, embedding, filter, vector_params)
                    .await
                    .map_err(SearchError::from)
            }
        )?;
        let (text_hits, text_stage) = text_recall;

        let has_text_hits = !text_hits.is_empty();
        let threshold = self.retrieval.threshold(has_text_hits);
        let vector_hits: Vec<ScoredPoint> = vector_hits
            .into_iter()
            .filter(|p| p.score >= threshold)
            .collect();
        log::debug!(
            "Recall: text={} ({}), vector={} (threshold {:.2})",
            text_hits.len(),
            text_stage.as_str(),
            vector_hits.len(),
            threshold
        );

        let fused = self
            .fusion
            .fuse(weights_for(query), &vector_hits, &text_hits);
        let gated = self.apply_gate(fused, has_text_hits);

        let mut hits = group_by_document(gated, self.retrieval.max_previews_per_document);
        hits.truncate(self.retrieval.limit);
        log::debug!("Hybrid search '{}': {} document hits", query, hits.len());

        Ok(HybridOutcome {
            hits,
            text_hit_count: text_hits.len(),
            vector_hit_count: vector_hits.len(),
            threshold,
            text_stage,
        })
    }

    fn apply_gate(&self, fused: Vec<ScoredCandidate>, has_text_hits: bool) -> Vec<ScoredCandidate> {
        let min_final = self.gate.min_final_score(self.fusion.strategy());
        let before = fused.len();
        let gated: Vec<ScoredCandidate> = fused
            .into_iter()
            .filter(|c| c.final_score >= min_final)
            .filter(|c| {
                has_text_hits
                    || !c.is_vector_only()
                    || c.original_vector_score.unwrap_or(0.0) >= self.gate.vector_only_min_similarity
            })
            .collect();
        if gated.len() < before {
            log::debug!("Quality gate dropped {} candidates", before - gated.len());
        }
        gated
    }

    /// Lexical recall, falling back to progressively weaker query forms while nothing matches.
    async fn text_recall(
        &self,
        query: &str,
        filter: &ScopeFilter,
    ) -> Result<(Vec<ScoredPoint>, TextRecallStage)> {
        let limit = self.retrieval.text_limit();

        let hits = self.text_search(query, filter, limit).await?;
        if !hits.is_empty() {
            return Ok((hits, TextRecallStage::Original));
        }

        let dehyphenated = dehyphenate(query);
        if dehyphenated != query {
            let hits = self.text_search(&dehyphenated, filter, limit).await?;
            if !hits.is_empty() {
                return Ok((hits, TextRecallStage::Dehyphenated));
            }
        }

        let folded = fold_umlauts(&dehyphenated);
        if folded != dehyphenated {
            let hits = self.text_search(&folded, filter, limit).await?;
            if !hits.is_empty() {
                return Ok((hits, TextRecallStage::UmlautFolded));
            }
        }

        let tokens = fallback_tokens(&dehyphenated, self.retrieval.min_fallback_token_chars);
        // A single token equal to the query was already tried.
        if tokens.len() > 1 || tokens.first().is_some_and(|t| t != &dehyphenated) {
            let searches = tokens
                .iter()
                .map(|token| self.text_search(token, filter, limit));
            let per_token = futures::future::try_join_all(searches).await?;
            let merged = or_merge(per_token, limit);
            if !merged.is_empty() {
                return Ok((merged, TextRecallStage::TokenOr));
            }
        }

        Ok((Vec::new(), TextRecallStage::Exhausted))
    }

    async fn text_search(
        &self,
        query: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        Ok(self
            .store
            .text_search(&self.collection, query, filter, limit)
            .await?)
    }
}

/// Union of per-token results, best score per point, best first.
fn or_merge(lists: Vec<Vec<ScoredPoint>>, limit: usize) -> Vec<ScoredPoint> {
    let mut best: HashMap<String, ScoredPoint> = HashMap::new();
    for point in lists.into_iter().flatten() {
        match best.get_mut(&point.id) {
            Some(existing) if existing.score >= point.score => {}
            Some(existing) => *existing = point,
            None => {
                best.insert(point.id.clone(), point);
            }
        }
    }
    let mut merged: Vec<ScoredPoint> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(limit);
    merged
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use citeseek_index_store::{
        IndexStore, IndexStoreError, ScopeFilter, ScoredPoint, VectorSearchParams,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted store: text results per exact query string, one fixed vector list.
    #[derive(Default)]
    pub struct ScriptedStore {
        pub text: HashMap<String, Vec<ScoredPoint>>,
        pub vector: Vec<ScoredPoint>,
        pub fail: bool,
        pub text_queries: Mutex<Vec<String>>,
        pub vector_thresholds: Mutex<Vec<f32>>,
    }

    #[async_trait]
    impl IndexStore for ScriptedStore {
        async fn vector_search(
            &self,
            _collection: &str,
            _embedding: &[f32],
            _filter: &ScopeFilter,
            params: VectorSearchParams,
        ) -> citeseek_index_store::Result<Vec<ScoredPoint>> {
            if self.fail {
                return Err(IndexStoreError::Unavailable("scripted failure".to_string()));
            }
            self.vector_thresholds.lock().unwrap().push(params.threshold);
            Ok(self
                .vector
                .iter()
                .filter(|p| p.score >= params.threshold)
                .take(params.limit)
                .cloned()
                .collect())
        }

        async fn text_search(
            &self,
            _collection: &str,
            query: &str,
            _filter: &ScopeFilter,
            limit: usize,
        ) -> citeseek_index_store::Result<Vec<ScoredPoint>> {
            self.text_queries.lock().unwrap().push(query.to_string());
            Ok(self
                .text
                .get(query)
                .map(|hits| hits.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }

        async fn scroll(
            &self,
            _collection: &str,
            _filter: &ScopeFilter,
            _limit: usize,
        ) -> citeseek_index_store::Result<Vec<ScoredPoint>> {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedStore;
    use super::*;
    use crate::candidate::test_support::point;
    use crate::config::FusionStrategy;
    use citeseek_protocol::SearchMethod;
    use pretty_assertions::assert_eq;

    fn engine(store: ScriptedStore) -> (HybridSearch, Arc<ScriptedStore>) {
        let store = Arc::new(store);
        let engine = HybridSearch::new(
            store.clone(),
            "chunks",
            RetrievalConfig::default(),
            &FusionConfig::default(),
            QualityGateConfig::default(),
        );
        (engine, store)
    }

    #[tokio::test]
    async fn fuses_both_lists_and_tags_methods() {
        let mut store = ScriptedStore::default();
        store
            .text
            .insert("water supply".to_string(), vec![point("a", 0, 0.9)]);
        store.vector = vec![point("a", 0, 0.7), point("b", 2, 0.6)];
        let (engine, _) = engine(store);

        let outcome = engine
            .search("water supply", &[0.0], &ScopeFilter::default())
            .await
            .unwrap();
        assert_eq!(outcome.text_stage, TextRecallStage::Original);
        assert_eq!(outcome.threshold, 0.25);
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].document_id, "a");
        assert_eq!(outcome.hits[0].primary.search_method(), SearchMethod::Hybrid);
        assert_eq!(outcome.hits[1].primary.search_method(), SearchMethod::Vector);
    }

    #[tokio::test]
    async fn text_fallbacks_run_in_order_until_something_matches() {
        let mut store = ScriptedStore::default();
        store.text.insert(
            "Strassenbau Foerderung".to_string(),
            vec![point("road", 0, 0.8)],
        );
        let (engine, store) = engine(store);

        let outcome = engine
            .search("Straßenbau-Förderung", &[0.0], &ScopeFilter::default())
            .await
            .unwrap();
        assert_eq!(outcome.text_stage, TextRecallStage::UmlautFolded);
        assert_eq!(outcome.text_hit_count, 1);
        let queries = store.text_queries.lock().unwrap().clone();
        assert_eq!(
            queries,
            vec![
                "Straßenbau-Förderung".to_string(),
                "Straßenbau Förderung".to_string(),
                "Strassenbau Foerderung".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn token_or_merge_keeps_best_score_per_point() {
        let mut store = ScriptedStore::default();
        store.text.insert(
            "Grundwasser".to_string(),
            vec![point("a", 0, 0.4), point("b", 0, 0.9)],
        );
        store
            .text
            .insert("Pegel".to_string(), vec![point("a", 0, 0.8)]);
        let (engine, _) = engine(store);

        let outcome = engine
            .search("Grundwasser und Pegel", &[0.0], &ScopeFilter::default())
            .await
            .unwrap();
        assert_eq!(outcome.text_stage, TextRecallStage::TokenOr);
        assert_eq!(outcome.text_hit_count, 2);
        assert_eq!(outcome.hits[0].primary.original_text_score, Some(0.9));
    }

    #[tokio::test]
    async fn vector_only_recall_uses_stricter_threshold_and_gate() {
        let mut store = ScriptedStore::default();
        store.vector = vec![point("a", 0, 0.55), point("b", 0, 0.38), point("c", 0, 0.3)];
        let (engine, store) = engine(store);

        let outcome = engine
            .search("nothing matches lexically", &[0.0], &ScopeFilter::default())
            .await
            .unwrap();
        assert_eq!(outcome.text_stage, TextRecallStage::Exhausted);
        assert_eq!(outcome.threshold, 0.35);
        // c fails the dynamic threshold, b fails the vector-only gate.
        assert_eq!(outcome.vector_hit_count, 2);
        let docs: Vec<&str> = outcome.hits.iter().map(|h| h.document_id.as_str()).collect();
        assert_eq!(docs, vec!["a"]);
        assert_eq!(*store.vector_thresholds.lock().unwrap(), vec![0.25]);
    }

    #[tokio::test]
    async fn linear_strategy_is_selectable() {
        let mut store = ScriptedStore::default();
        store.text.insert("water".to_string(), vec![point("t", 0, 1.0)]);
        store.vector = vec![point("v", 0, 0.3)];
        let store = Arc::new(store);
        let engine = HybridSearch::new(
            store,
            "chunks",
            RetrievalConfig::default(),
            &FusionConfig {
                strategy: FusionStrategy::Linear,
                ..FusionConfig::default()
            },
            QualityGateConfig::default(),
        );
        let outcome = engine
            .search("water", &[0.0], &ScopeFilter::default())
            .await
            .unwrap();
        // text-only 1.0 * 0.3 = 0.3; vector-only 0.3 * 0.7 = 0.21
        let docs: Vec<&str> = outcome.hits.iter().map(|h| h.document_id.as_str()).collect();
        assert_eq!(docs, vec!["t", "v"]);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = ScriptedStore {
            fail: true,
            ..ScriptedStore::default()
        };
        let (engine, _) = engine(store);
        let err = engine
            .search("anything", &[0.0], &ScopeFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Store(_)));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (engine, _) = engine(ScriptedStore::default());
        let err = engine
            .search("   ", &[0.0], &ScopeFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
    }
}
