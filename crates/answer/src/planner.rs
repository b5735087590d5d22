use crate::drafter::{Drafter, GenerateOptions};
use crate::prompts::{planner_user_prompt, PLANNER_SYSTEM_PROMPT};
use citeseek_citation::strip_code_fences;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Upper bound on subqueries per question, and so on fan-out width.
pub const MAX_SUBQUERIES: usize = 4;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// When false every question is searched as-is.
    pub enabled: bool,
    /// `1..=MAX_SUBQUERIES`.
    pub max_subqueries: usize,
    /// Questions with at most this many words skip planning.
    pub short_question_words: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_subqueries: MAX_SUBQUERIES,
            short_question_words: 3,
        }
    }
}

#[derive(Deserialize)]
struct SubqueryPlan {
    subqueries: Vec<serde_json::Value>,
}

/// Splits a question into focused subqueries. Never fails: anything unexpected falls back to
/// searching the question itself.
pub struct QueryPlanner {
    drafter: Arc<dyn Drafter>,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(drafter: Arc<dyn Drafter>, config: PlannerConfig) -> Self {
        Self { drafter, config }
    }

    pub async fn plan(&self, question: &str) -> Vec<String> {
        let question = question.trim();
        let words = question.split_whitespace().count();
        if !self.config.enabled || words <= self.config.short_question_words {
            return vec![question.to_string()];
        }

        let max = self.config.max_subqueries.clamp(1, MAX_SUBQUERIES);
        let raw = match self
            .drafter
            .generate(
                PLANNER_SYSTEM_PROMPT,
                &planner_user_prompt(question, max),
                &GenerateOptions::json(),
            )
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("Query planning failed, searching the question as-is: {err}");
                return vec![question.to_string()];
            }
        };

        match parse_subqueries(&raw, max) {
            Some(subqueries) => {
                log::debug!("Planned {} subqueries: {:?}", subqueries.len(), subqueries);
                subqueries
            }
            None => {
                log::warn!("Unusable query plan, searching the question as-is");
                vec![question.to_string()]
            }
        }
    }
}

/// Extracts `{"subqueries": [...]}` from a model reply, tolerating code fences and prose
/// around the object. Returns `None` when nothing usable is found.
#[must_use]
pub fn parse_subqueries(raw: &str, max: usize) -> Option<Vec<String>> {
    let text = strip_code_fences(raw);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let plan: SubqueryPlan = serde_json::from_str(&text[start..=end]).ok()?;

    let mut seen = HashSet::new();
    let subqueries: Vec<String> = plan
        .subqueries
        .iter()
        .filter_map(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(max)
        .map(str::to_string)
        .collect();

    (!subqueries.is_empty()).then_some(subqueries)
}
