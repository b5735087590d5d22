use crate::config::DiversifierConfig;
use citeseek_protocol::{evidence_order, EvidenceChunk};
use std::collections::HashMap;

/// Floor and cap derived from one pool's score distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityPlan {
    pub high_count: usize,
    pub medium_count: usize,
    pub floor: f32,
    pub cap: usize,
}

/// Adapts the final evidence floor and cap to how rich the pool is.
#[derive(Debug, Clone, Default)]
pub struct Diversifier {
    config: DiversifierConfig,
}

impl Diversifier {
    #[must_use]
    pub fn new(config: DiversifierConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn plan(&self, pool: &[EvidenceChunk]) -> DiversityPlan {
        let high_count = pool
            .iter()
            .filter(|c| c.similarity > self.config.high_band)
            .count();
        let medium_count = pool
            .iter()
            .filter(|c| c.similarity > self.config.medium_band)
            .count();
        self.plan_for_counts(high_count, medium_count)
    }

    #[must_use]
    pub fn plan_for_counts(&self, high_count: usize, medium_count: usize) -> DiversityPlan {
        let (floor, cap) = self
            .config
            .tiers
            .iter()
            .find(|tier| tier.applies(high_count, medium_count))
            .map_or(
                (self.config.fallback_floor, self.config.fallback_cap),
                |tier| (tier.floor, tier.cap),
            );
        DiversityPlan {
            high_count,
            medium_count,
            floor,
            cap,
        }
    }

    /// Filters by the plan's floor, sorts (similarity desc, title asc), applies the optional
    /// per-document limit and truncates to the cap.
    #[must_use]
    pub fn diversify(&self, pool: Vec<EvidenceChunk>) -> (Vec<EvidenceChunk>, DiversityPlan) {
        let plan = self.plan(&pool);
        let mut kept: Vec<EvidenceChunk> = pool
            .into_iter()
            .filter(|c| c.similarity >= plan.floor)
            .collect();
        kept.sort_by(evidence_order);

        if let Some(per_doc) = self.config.max_chunks_per_document {
            let mut counts: HashMap<String, usize> = HashMap::new();
            kept.retain(|c| {
                let count = counts.entry(c.document_id.clone()).or_insert(0);
                *count += 1;
                *count <= per_doc
            });
        }

        kept.truncate(plan.cap);
        log::debug!(
            "Diversifier: high={}, medium={} -> floor {:.2}, cap {}, kept {}",
            plan.high_count,
            plan.medium_count,
            plan.floor,
            plan.cap,
            kept.len()
        );
        (kept, plan)
    }
}
