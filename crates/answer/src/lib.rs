//! Citation-grounded answering: query planning, retrieval, drafting and citation repair wired
//! into one [`AnswerPipeline`].
//!
//! Collaborators are injected: an [`IndexStore`](citeseek_index_store::IndexStore), an
//! [`Embedder`](citeseek_index_store::Embedder) and a [`Drafter`].

mod config;
mod drafter;
mod error;
mod pipeline;
mod planner;
pub mod prompts;

pub use config::AnswerConfig;
pub use drafter::{Drafter, GenerateOptions};
pub use error::{DraftingError, PipelineError, Result};
pub use pipeline::{AnswerPipeline, Retrieval};
pub use planner::{parse_subqueries, PlannerConfig, QueryPlanner, MAX_SUBQUERIES};
