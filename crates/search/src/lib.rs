//! Hybrid retrieval: per-subquery semantic + lexical search with rank fusion, fan-out across
//! subqueries, and the dynamic diversifier that shapes the final evidence pool.

mod aggregate;
mod candidate;
mod config;
mod diversify;
mod error;
mod fusion;
mod hybrid;
mod normalization;
mod weighting;

pub use aggregate::{expand_hit, FanOutAggregator};
pub use candidate::{DocumentHit, ScoredCandidate};
pub use config::{
    DiversifierConfig, DiversityTier, FusionConfig, FusionStrategy, QualityGateConfig,
    RetrievalConfig,
};
pub use diversify::{Diversifier, DiversityPlan};
pub use error::{Result, SearchError};
pub use fusion::{Fusion, LinearFusion, RrfFusion};
pub use hybrid::{HybridOutcome, HybridSearch};
pub use normalization::{dehyphenate, fallback_tokens, fold_umlauts, TextRecallStage};
pub use weighting::{weights_for, QueryWeights};
