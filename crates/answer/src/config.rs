use crate::drafter::GenerateOptions;
use crate::planner::{PlannerConfig, MAX_SUBQUERIES};
use anyhow::{anyhow, Context, Result};
use citeseek_citation::CitationConfig;
use citeseek_search::{DiversifierConfig, FusionConfig, QualityGateConfig, RetrievalConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Pipeline configuration, loaded from TOML. Every section and field is optional.
///
/// ```toml
/// collection = "chunks"
/// request_timeout_ms = 20000
///
/// [fusion]
/// strategy = "linear"
///
/// [diversifier]
/// max_chunks_per_document = 4
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    /// Index collection holding the chunk points.
    pub collection: String,
    /// Upper bound on planning plus retrieval. `None` waits for every subquery.
    pub request_timeout_ms: Option<u64>,
    pub planner: PlannerConfig,
    pub retrieval: RetrievalConfig,
    pub fusion: FusionConfig,
    pub gate: QualityGateConfig,
    pub diversifier: DiversifierConfig,
    pub citations: CitationConfig,
    pub drafting: GenerateOptions,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            collection: "chunks".to_string(),
            request_timeout_ms: None,
            planner: PlannerConfig::default(),
            retrieval: RetrievalConfig::default(),
            fusion: FusionConfig::default(),
            gate: QualityGateConfig::default(),
            diversifier: DiversifierConfig::default(),
            citations: CitationConfig::default(),
            drafting: GenerateOptions::default(),
        }
    }
}

impl AnswerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(anyhow!("collection must not be empty"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(anyhow!("request_timeout_ms must be positive"));
        }
        if !(1..=MAX_SUBQUERIES).contains(&self.planner.max_subqueries) {
            return Err(anyhow!(
                "planner.max_subqueries must be within 1..={MAX_SUBQUERIES}, got {}",
                self.planner.max_subqueries
            ));
        }
        if !(0.0..=2.0).contains(&self.drafting.temperature) {
            return Err(anyhow!("drafting.temperature must be within [0, 2]"));
        }
        self.retrieval.validate()?;
        self.fusion.validate()?;
        self.gate.validate()?;
        self.diversifier.validate()?;
        self.citations.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
