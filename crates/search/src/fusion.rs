use crate::candidate::{evidence_from_point, ScoredCandidate};
use crate::config::{FusionConfig, FusionStrategy};
use crate::weighting::QueryWeights;
use citeseek_index_store::ScoredPoint;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Per-point signals from both lists, in first-seen order (vector list first).
struct Signal<'a> {
    point: &'a ScoredPoint,
    /// `(rank, score)` in the vector list.
    vector: Option<(usize, f32)>,
    /// `(rank, score)` in the text list.
    text: Option<(usize, f32)>,
}

fn collect_signals<'a>(vector: &'a [ScoredPoint], text: &'a [ScoredPoint]) -> Vec<Signal<'a>> {
    let mut signals: Vec<Signal<'a>> = Vec::with_capacity(vector.len() + text.len());
    let mut by_key: HashMap<(&str, u32), usize> = HashMap::new();

    for (rank, point) in vector.iter().enumerate() {
        let key = (point.payload.document_id.as_str(), point.payload.chunk_index);
        if by_key.contains_key(&key) {
            continue;
        }
        by_key.insert(key, signals.len());
        signals.push(Signal {
            point,
            vector: Some((rank, point.score)),
            text: None,
        });
    }

    for (rank, point) in text.iter().enumerate() {
        let key = (point.payload.document_id.as_str(), point.payload.chunk_index);
        match by_key.get(&key) {
            Some(&pos) => {
                let signal = &mut signals[pos];
                if signal.text.is_none() {
                    signal.text = Some((rank, point.score));
                }
            }
            None => {
                by_key.insert(key, signals.len());
                signals.push(Signal {
                    point,
                    vector: None,
                    text: Some((rank, point.score)),
                });
            }
        }
    }
    signals
}

/// Reciprocal Rank Fusion with a confidence multiplier.
///
/// RRF formula: score(d) = Σ 1 / (k + rank_i(d) + 1), then multiplied by a boost when both lists
/// found the item and by a penalty when only the vector list did.
#[derive(Debug, Clone)]
pub struct RrfFusion {
    k: f32,
    both_methods_boost: f32,
    vector_only_penalty: f32,
}

impl RrfFusion {
    #[must_use]
    pub fn new(k: f32, both_methods_boost: f32, vector_only_penalty: f32) -> Self {
        Self {
            k,
            both_methods_boost,
            vector_only_penalty,
        }
    }

    #[must_use]
    pub fn rank_score(&self, rank: usize) -> f32 {
        1.0 / (self.k + rank as f32 + 1.0)
    }

    #[must_use]
    pub fn fuse(&self, vector: &[ScoredPoint], text: &[ScoredPoint]) -> Vec<ScoredCandidate> {
        let mut fused: Vec<ScoredCandidate> = collect_signals(vector, text)
            .into_iter()
            .filter_map(|signal| {
                let vector_score = signal.vector.map(|(_, s)| s);
                let text_score = signal.text.map(|(_, s)| s);
                let raw = signal.vector.map_or(0.0, |(r, _)| self.rank_score(r))
                    + signal.text.map_or(0.0, |(r, _)| self.rank_score(r));
                let confidence = match (signal.vector.is_some(), signal.text.is_some()) {
                    (true, true) => self.both_methods_boost,
                    (true, false) => self.vector_only_penalty,
                    _ => 1.0,
                };
                let chunk = evidence_from_point(signal.point, vector_score, text_score)?;
                Some(ScoredCandidate {
                    chunk,
                    raw_rank_score: raw,
                    original_vector_score: vector_score,
                    original_text_score: text_score,
                    confidence,
                    final_score: raw * confidence,
                })
            })
            .collect();
        sort_candidates(&mut fused);
        fused
    }
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new(60.0, 1.2, 0.7)
    }
}

/// Weighted linear combination of the lists' native scores.
#[derive(Debug, Clone)]
pub struct LinearFusion {
    text_shift: f32,
}

impl LinearFusion {
    #[must_use]
    pub fn new(text_shift: f32) -> Self {
        Self { text_shift }
    }

    /// Effective weights: toward text when lexical search confirmed something, vector-only
    /// otherwise; always normalized to sum 1.
    #[must_use]
    pub fn effective_weights(&self, weights: QueryWeights, has_text_hits: bool) -> QueryWeights {
        if has_text_hits {
            weights.normalized().shifted_toward_text(self.text_shift).normalized()
        } else {
            QueryWeights::new(1.0, 0.0)
        }
    }

    #[must_use]
    pub fn fuse(
        &self,
        weights: QueryWeights,
        vector: &[ScoredPoint],
        text: &[ScoredPoint],
    ) -> Vec<ScoredCandidate> {
        let w = self.effective_weights(weights, !text.is_empty());
        log::debug!(
            "Linear fusion weights: vector={:.2}, text={:.2}",
            w.vector,
            w.text
        );

        let mut fused: Vec<ScoredCandidate> = collect_signals(vector, text)
            .into_iter()
            .filter_map(|signal| {
                let vector_score = signal.vector.map(|(_, s)| s);
                let text_score = signal.text.map(|(_, s)| s);
                let combined = vector_score.map_or(0.0, |s| w.vector * s)
                    + text_score.map_or(0.0, |s| w.text * s);
                let chunk = evidence_from_point(signal.point, vector_score, text_score)?;
                Some(ScoredCandidate {
                    chunk,
                    raw_rank_score: combined,
                    original_vector_score: vector_score,
                    original_text_score: text_score,
                    confidence: 1.0,
                    final_score: combined,
                })
            })
            .collect();
        sort_candidates(&mut fused);
        fused
    }
}

/// The configured fusion strategy.
#[derive(Debug, Clone)]
pub enum Fusion {
    Rrf(RrfFusion),
    Linear(LinearFusion),
}

impl Fusion {
    #[must_use]
    pub fn from_config(cfg: &FusionConfig) -> Self {
        match cfg.strategy {
            FusionStrategy::Rrf => Self::Rrf(RrfFusion::new(
                cfg.rrf_k,
                cfg.both_methods_boost,
                cfg.vector_only_penalty,
            )),
            FusionStrategy::Linear => Self::Linear(LinearFusion::new(cfg.text_shift)),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> FusionStrategy {
        match self {
            Self::Rrf(_) => FusionStrategy::Rrf,
            Self::Linear(_) => FusionStrategy::Linear,
        }
    }

    #[must_use]
    pub fn fuse(
        &self,
        weights: QueryWeights,
        vector: &[ScoredPoint],
        text: &[ScoredPoint],
    ) -> Vec<ScoredCandidate> {
        match self {
            Self::Rrf(rrf) => rrf.fuse(vector, text),
            Self::Linear(linear) => linear.fuse(weights, vector, text),
        }
    }
}

fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
}
