//! Citation handling for drafted answers.
//!
//! A draft cites evidence as `[n]`, where `n` is an id from a [`ReferenceMap`]. Processing a
//! draft cleans it up, renumbers the citations it actually uses to `1..=M` by first appearance,
//! replaces them by the configured marker, drops citations that name no reference and groups
//! the cited excerpts into sources.
//!
//! ```
//! use citeseek_citation::{CitationConfig, CitationProcessor, ReferenceMap};
//! use citeseek_protocol::{EvidenceChunk, SearchMethod};
//!
//! let chunk = EvidenceChunk {
//!     document_id: "doc-1".into(),
//!     url: None,
//!     filename: None,
//!     title: "Klimabericht".into(),
//!     snippet_text: "Klima ist wichtig.".into(),
//!     similarity: 0.8,
//!     chunk_index: 0,
//!     page_number: None,
//!     search_method: SearchMethod::Hybrid,
//! };
//! let references = ReferenceMap::build(&[chunk]);
//! let processed = CitationProcessor::new(CitationConfig::default())
//!     .process("Klima ist wichtig [1].", &references);
//! assert_eq!(processed.answer, "Klima ist wichtig.⟦cite:1⟧");
//! assert!(!processed.needs_repair());
//! ```

mod clean;
mod config;
mod error;
mod references;
mod renumber;
mod scan;
mod sources;
mod validate;

pub use clean::{
    clean_draft, move_punctuation_before_citations, split_citation_lists, strip_code_fences,
    strip_sources_section,
};
pub use config::CitationConfig;
pub use error::CitationIssue;
pub use references::ReferenceMap;
pub use renumber::{renumber, Renumbered, Segment};
pub use scan::{scan_citations, CitationSpan};
pub use sources::group_sources;
pub use validate::{validate_citations, ValidatedAnswer};

use citeseek_protocol::{Citation, Source};

/// Everything derived from one draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDraft {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<Source>,
    pub issues: Vec<CitationIssue>,
    /// Reference map restricted to the cited entries, ids as in `answer`.
    pub cited_references: ReferenceMap,
}

impl ProcessedDraft {
    /// Whether the draft cited ids that do not exist.
    #[must_use]
    pub fn needs_repair(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Turns a raw draft into a validated answer with citations and sources.
#[derive(Debug, Clone, Default)]
pub struct CitationProcessor {
    config: CitationConfig,
}

impl CitationProcessor {
    #[must_use]
    pub fn new(config: CitationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CitationConfig {
        &self.config
    }

    #[must_use]
    pub fn process(&self, draft: &str, references: &ReferenceMap) -> ProcessedDraft {
        let cleaned = clean_draft(draft);
        let renumbered = renumber(&cleaned, references);
        let validated = validate_citations(&renumbered, &self.config);
        let sources = group_sources(&validated.citations, &self.config.source_separator);
        log::debug!(
            "Processed draft: {} citations, {} sources, {} issues",
            validated.citations.len(),
            sources.len(),
            validated.issues.len()
        );
        ProcessedDraft {
            answer: validated.answer,
            citations: validated.citations,
            sources,
            issues: validated.issues,
            cited_references: renumbered.references,
        }
    }
}
