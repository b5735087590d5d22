use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Candidate counts and similarity thresholds for one hybrid search.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Document hits kept per subquery.
    pub limit: usize,
    /// Candidates fetched per list before fusion. Vector recall fetches 1.5x this.
    pub recall_limit: usize,
    /// Caller-supplied similarity threshold; the dynamic threshold never goes below it.
    pub base_threshold: f32,
    /// Threshold floor when text search confirmed at least one hit.
    pub with_text_min_threshold: f32,
    /// Threshold floor for unconfirmed, vector-only recall.
    pub vector_only_min_threshold: f32,
    /// Chunk previews kept per document hit. `0` keeps only the primary excerpt.
    pub max_previews_per_document: usize,
    /// Shortest token used by the OR-merge text fallback.
    pub min_fallback_token_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            recall_limit: 20,
            base_threshold: 0.2,
            with_text_min_threshold: 0.25,
            vector_only_min_threshold: 0.35,
            max_previews_per_document: 3,
            min_fallback_token_chars: 4,
        }
    }
}

impl RetrievalConfig {
    #[must_use]
    pub fn text_limit(&self) -> usize {
        self.limit.max(self.recall_limit)
    }

    #[must_use]
    pub fn vector_limit(&self) -> usize {
        let widened = (self.recall_limit as f64 * 1.5).round() as usize;
        self.limit.max(widened)
    }

    /// Dynamic similarity threshold for vector recall.
    #[must_use]
    pub fn threshold(&self, has_text_hits: bool) -> f32 {
        let floor = if has_text_hits {
            self.with_text_min_threshold
        } else {
            self.vector_only_min_threshold
        };
        self.base_threshold.max(floor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(anyhow!("retrieval.limit must be > 0"));
        }
        if self.recall_limit == 0 {
            return Err(anyhow!("retrieval.recall_limit must be > 0"));
        }
        validate_unit("retrieval.base_threshold", self.base_threshold)?;
        validate_unit(
            "retrieval.with_text_min_threshold",
            self.with_text_min_threshold,
        )?;
        validate_unit(
            "retrieval.vector_only_min_threshold",
            self.vector_only_min_threshold,
        )?;
        if self.with_text_min_threshold > self.vector_only_min_threshold {
            return Err(anyhow!(
                "retrieval.with_text_min_threshold ({}) must not exceed retrieval.vector_only_min_threshold ({})",
                self.with_text_min_threshold,
                self.vector_only_min_threshold
            ));
        }
        if self.min_fallback_token_chars == 0 {
            return Err(anyhow!("retrieval.min_fallback_token_chars must be > 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    #[default]
    Rrf,
    Linear,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub strategy: FusionStrategy,
    /// RRF constant k.
    pub rrf_k: f32,
    /// Confidence multiplier for items found by both lists. Must be >= 1.
    pub both_methods_boost: f32,
    /// Confidence multiplier for vector-only items.
    pub vector_only_penalty: f32,
    /// Weight moved from vector to text in linear fusion when text hits exist.
    pub text_shift: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            strategy: FusionStrategy::Rrf,
            rrf_k: 60.0,
            both_methods_boost: 1.2,
            vector_only_penalty: 0.7,
            text_shift: 0.1,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rrf_k.is_finite() && self.rrf_k >= 0.0) {
            return Err(anyhow!("fusion.rrf_k must be a non-negative number"));
        }
        if !(self.both_methods_boost.is_finite() && self.both_methods_boost >= 1.0) {
            return Err(anyhow!("fusion.both_methods_boost must be >= 1.0"));
        }
        if !(self.vector_only_penalty > 0.0 && self.vector_only_penalty <= 1.0) {
            return Err(anyhow!("fusion.vector_only_penalty must be in (0, 1]"));
        }
        validate_unit("fusion.text_shift", self.text_shift)?;
        Ok(())
    }
}

/// Post-fusion score floors.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityGateConfig {
    /// Minimum `rrf * confidence` for RRF fusion.
    pub min_rrf_score: f32,
    /// Minimum combined score for linear fusion.
    pub min_linear_score: f32,
    /// Minimum vector similarity for vector-only results when text search found nothing.
    pub vector_only_min_similarity: f32,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_rrf_score: 0.005,
            min_linear_score: 0.15,
            vector_only_min_similarity: 0.4,
        }
    }
}

impl QualityGateConfig {
    #[must_use]
    pub fn min_final_score(&self, strategy: FusionStrategy) -> f32 {
        match strategy {
            FusionStrategy::Rrf => self.min_rrf_score,
            FusionStrategy::Linear => self.min_linear_score,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit("gate.min_rrf_score", self.min_rrf_score)?;
        validate_unit("gate.min_linear_score", self.min_linear_score)?;
        validate_unit(
            "gate.vector_only_min_similarity",
            self.vector_only_min_similarity,
        )
    }
}

/// One step of the diversifier's step function. A tier applies when any of its set minimums
/// is reached; tiers are checked top to bottom.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DiversityTier {
    #[serde(default)]
    pub min_high: Option<usize>,
    #[serde(default)]
    pub min_medium: Option<usize>,
    pub floor: f32,
    pub cap: usize,
}

impl DiversityTier {
    #[must_use]
    pub fn applies(&self, high: usize, medium: usize) -> bool {
        self.min_high.is_some_and(|min| high >= min)
            || self.min_medium.is_some_and(|min| medium >= min)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiversifierConfig {
    /// Similarity above which an item counts as high quality.
    pub high_band: f32,
    /// Similarity above which an item counts as medium quality.
    pub medium_band: f32,
    pub tiers: Vec<DiversityTier>,
    /// Floor when no tier applies.
    pub fallback_floor: f32,
    /// Cap when no tier applies.
    pub fallback_cap: usize,
    /// Older policy: keep at most this many chunks per document. `None` disables the limit.
    pub max_chunks_per_document: Option<usize>,
}

impl Default for DiversifierConfig {
    fn default() -> Self {
        Self {
            high_band: 0.45,
            medium_band: 0.38,
            tiers: vec![
                DiversityTier {
                    min_high: Some(15),
                    min_medium: None,
                    floor: 0.40,
                    cap: 25,
                },
                DiversityTier {
                    min_high: Some(8),
                    min_medium: None,
                    floor: 0.38,
                    cap: 20,
                },
                DiversityTier {
                    min_high: Some(3),
                    min_medium: Some(8),
                    floor: 0.37,
                    cap: 15,
                },
                DiversityTier {
                    min_high: None,
                    min_medium: Some(3),
                    floor: 0.36,
                    cap: 12,
                },
            ],
            fallback_floor: 0.35,
            fallback_cap: 8,
            max_chunks_per_document: None,
        }
    }
}

impl DiversifierConfig {
    pub fn validate(&self) -> Result<()> {
        validate_unit("diversifier.high_band", self.high_band)?;
        validate_unit("diversifier.medium_band", self.medium_band)?;
        if self.medium_band > self.high_band {
            return Err(anyhow!(
                "diversifier.medium_band must not exceed diversifier.high_band"
            ));
        }
        validate_unit("diversifier.fallback_floor", self.fallback_floor)?;
        if self.fallback_cap == 0 {
            return Err(anyhow!("diversifier.fallback_cap must be > 0"));
        }

        // Richer tiers come first and must never relax the floor or shrink the cap.
        let mut prev: Option<(f32, usize)> = None;
        for (idx, tier) in self.tiers.iter().enumerate() {
            validate_unit(&format!("diversifier.tiers[{idx}].floor"), tier.floor)?;
            if tier.cap == 0 {
                return Err(anyhow!("diversifier.tiers[{idx}].cap must be > 0"));
            }
            if tier.min_high.is_none() && tier.min_medium.is_none() {
                return Err(anyhow!(
                    "diversifier.tiers[{idx}] needs min_high or min_medium"
                ));
            }
            if let Some((floor, cap)) = prev {
                if tier.floor > floor || tier.cap > cap {
                    return Err(anyhow!(
                        "diversifier.tiers[{idx}] must not raise floor or cap above the previous tier"
                    ));
                }
            }
            prev = Some((tier.floor, tier.cap));
        }
        if let Some((floor, cap)) = prev {
            if self.fallback_floor > floor || self.fallback_cap > cap {
                return Err(anyhow!(
                    "diversifier.fallback_floor/fallback_cap must not exceed the last tier"
                ));
            }
        }
        if self.max_chunks_per_document == Some(0) {
            return Err(anyhow!(
                "diversifier.max_chunks_per_document must be > 0 when set"
            ));
        }
        Ok(())
    }
}

fn validate_unit(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(anyhow!("{field} must be within [0, 1] (got {value})"))
    }
}
