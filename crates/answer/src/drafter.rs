use crate::error::DraftingError;
use async_trait::async_trait;
use serde::Deserialize;

/// Sampling options passed with every drafting call.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the model for a JSON object instead of prose.
    pub json_mode: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: Some(1200),
            json_mode: false,
        }
    }
}

impl GenerateOptions {
    /// Deterministic JSON output, used by the query planner.
    #[must_use]
    pub fn json() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: Some(200),
            json_mode: true,
        }
    }
}

/// The language model that plans subqueries, drafts answers and repairs citations.
#[async_trait]
pub trait Drafter: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, DraftingError>;
}
