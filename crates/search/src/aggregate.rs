use crate::candidate::DocumentHit;
use crate::error::{Result, SearchError};
use crate::hybrid::{HybridOutcome, HybridSearch};
use citeseek_index_store::{Embedder, ScopeFilter};
use citeseek_protocol::{EvidenceChunk, EvidenceKey};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs one hybrid search per subquery and merges the results into a deduplicated pool.
pub struct FanOutAggregator {
    engine: Arc<HybridSearch>,
    embedder: Arc<dyn Embedder>,
}

impl FanOutAggregator {
    pub fn new(engine: Arc<HybridSearch>, embedder: Arc<dyn Embedder>) -> Self {
        Self { engine, embedder }
    }

    /// Searches all subqueries concurrently and returns the evidence pool.
    ///
    /// All subqueries must finish before anything is returned: any failure fails the whole
    /// fan-out, and cancellation drops in-flight searches and yields [`SearchError::Cancelled`].
    pub async fn gather(
        &self,
        subqueries: &[String],
        filter: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<EvidenceChunk>> {
        if subqueries.is_empty() {
            return Ok(Vec::new());
        }

        let searches = subqueries
            .iter()
            .map(|subquery| self.search_one(subquery, filter));
        let outcomes = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log::info!("Fan-out cancelled with {} subqueries in flight", subqueries.len());
                return Err(SearchError::Cancelled);
            }
            outcomes = futures::future::try_join_all(searches) => outcomes?,
        };

        let pool = merge_outcomes(&outcomes);
        log::info!(
            "Fan-out: {} subqueries -> {} evidence chunks",
            subqueries.len(),
            pool.len()
        );
        Ok(pool)
    }

    async fn search_one(&self, subquery: &str, filter: &ScopeFilter) -> Result<HybridOutcome> {
        let embedding = self.embedder.embed(subquery).await?;
        self.engine.search(subquery, &embedding, filter).await
    }
}

/// One evidence chunk per chunk preview, or the primary excerpt when there are none.
#[must_use]
pub fn expand_hit(hit: &DocumentHit) -> Vec<EvidenceChunk> {
    if hit.previews.is_empty() {
        return vec![hit.primary.chunk.clone()];
    }
    hit.previews.iter().map(|c| c.chunk.clone()).collect()
}

/// Expands every hit and keeps the first occurrence of each `(document_id, chunk_index)`,
/// walking subqueries in order and hits in rank order.
fn merge_outcomes(outcomes: &[HybridOutcome]) -> Vec<EvidenceChunk> {
    let mut seen: HashSet<EvidenceKey> = HashSet::new();
    let mut pool = Vec::new();
    for outcome in outcomes {
        for hit in &outcome.hits {
            for chunk in expand_hit(hit) {
                if seen.insert(chunk.key()) {
                    pool.push(chunk);
                }
            }
        }
    }
    pool
}
