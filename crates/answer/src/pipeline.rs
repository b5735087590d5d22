use crate::config::AnswerConfig;
use crate::drafter::{Drafter, GenerateOptions};
use crate::error::{PipelineError, Result};
use crate::planner::QueryPlanner;
use crate::prompts::{
    answer_user_prompt, repair_user_prompt, ANSWER_SYSTEM_PROMPT, REPAIR_SYSTEM_PROMPT,
};
use citeseek_citation::{CitationProcessor, ProcessedDraft, ReferenceMap};
use citeseek_index_store::{Embedder, IndexStore, ScopeFilter};
use citeseek_protocol::{AnswerResult, EvidenceChunk};
use citeseek_search::{Diversifier, DiversityPlan, FanOutAggregator, HybridSearch};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Evidence selected for one question, before any drafting.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub subqueries: Vec<String>,
    /// Diversified pool in reference order.
    pub evidence: Vec<EvidenceChunk>,
    pub plan: DiversityPlan,
    pub references: ReferenceMap,
}

/// Question in, citation-grounded answer out.
///
/// Stages: plan subqueries, fan out hybrid retrieval, diversify, number the references,
/// draft, validate citations and repair them at most once.
pub struct AnswerPipeline {
    planner: QueryPlanner,
    aggregator: FanOutAggregator,
    diversifier: Diversifier,
    processor: CitationProcessor,
    drafter: Arc<dyn Drafter>,
    drafting: GenerateOptions,
    timeout: Option<Duration>,
}

impl AnswerPipeline {
    pub fn new(
        config: &AnswerConfig,
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn Embedder>,
        drafter: Arc<dyn Drafter>,
    ) -> Self {
        let engine = HybridSearch::new(
            store,
            config.collection.clone(),
            config.retrieval.clone(),
            &config.fusion,
            config.gate.clone(),
        );
        Self {
            planner: QueryPlanner::new(drafter.clone(), config.planner.clone()),
            aggregator: FanOutAggregator::new(Arc::new(engine), embedder),
            diversifier: Diversifier::new(config.diversifier.clone()),
            processor: CitationProcessor::new(config.citations.clone()),
            drafter,
            drafting: config.drafting.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// Plans, retrieves and diversifies evidence, then numbers it.
    pub async fn retrieve(
        &self,
        question: &str,
        filter: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<Retrieval> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let started = Instant::now();
        let gathering = self.plan_and_gather(question, filter, cancel);
        let (subqueries, pool) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, gathering).await.map_err(|_| {
                log::warn!("Retrieval exceeded {} ms", limit.as_millis());
                PipelineError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            })??,
            None => gathering.await?,
        };

        let (evidence, plan) = self.diversifier.diversify(pool);
        let references = ReferenceMap::build(&evidence);
        log::info!(
            "Retrieved {} references from {} subqueries in {} ms",
            references.len(),
            subqueries.len(),
            started.elapsed().as_millis()
        );
        Ok(Retrieval {
            subqueries,
            evidence,
            plan,
            references,
        })
    }

    /// Runs the whole pipeline for one question.
    pub async fn answer(
        &self,
        question: &str,
        filter: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<AnswerResult> {
        let retrieval = self.retrieve(question, filter, cancel).await?;
        if retrieval.references.is_empty() {
            log::info!("No evidence for question, returning the fixed answer");
            return Ok(AnswerResult::no_evidence());
        }
        let references = &retrieval.references;

        let draft = self
            .generate(
                ANSWER_SYSTEM_PROMPT,
                &answer_user_prompt(question.trim(), references),
                cancel,
            )
            .await?;
        let mut processed = self.processor.process(&draft, references);

        if processed.needs_repair() {
            processed = self.repair(&draft, references, processed, cancel).await?;
        }

        Ok(AnswerResult::new(
            processed.answer,
            processed.citations,
            processed.sources,
        ))
    }

    /// One repair attempt. Whatever it yields is final; a failed repair call keeps the first
    /// processed draft, whose invalid citations were already dropped.
    async fn repair(
        &self,
        draft: &str,
        references: &ReferenceMap,
        first: ProcessedDraft,
        cancel: &CancellationToken,
    ) -> Result<ProcessedDraft> {
        log::info!(
            "Draft has {} invalid citation(s), requesting one repair",
            first.issues.len()
        );
        let prompt = repair_user_prompt(draft, &references.ids(), &first.issues);
        let repaired = match self.generate(REPAIR_SYSTEM_PROMPT, &prompt, cancel).await {
            Ok(repaired) => repaired,
            Err(PipelineError::Drafting(err)) => {
                log::warn!("Citation repair failed, keeping the first draft: {err}");
                return Ok(first);
            }
            Err(err) => return Err(err),
        };

        let second = self.processor.process(&repaired, references);
        if second.needs_repair() {
            log::warn!(
                "Repaired draft still has {} invalid citation(s); they are dropped",
                second.issues.len()
            );
        }
        Ok(second)
    }

    async fn plan_and_gather(
        &self,
        question: &str,
        filter: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<(Vec<String>, Vec<EvidenceChunk>)> {
        let subqueries = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            subqueries = self.planner.plan(question) => subqueries,
        };
        let pool = self.aggregator.gather(&subqueries, filter, cancel).await?;
        Ok((subqueries, pool))
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PipelineError::Cancelled),
            reply = self.drafter.generate(system_prompt, user_prompt, &self.drafting) => {
                Ok(reply?)
            }
        }
    }
}
