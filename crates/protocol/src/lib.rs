//! Shared data model for retrieval, reference tables and citation-grounded answers.
//!
//! Every type here is plain data: produced by one stage of the pipeline and read by the next.
//! JSON field names follow the caller-facing contract (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fixed answer returned when no evidence survives retrieval.
pub const NO_EVIDENCE_ANSWER: &str =
    "No relevant passages were found in the selected documents for this question.";

/// Which retrieval list an evidence item came from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Vector,
    Text,
    Hybrid,
}

impl SearchMethod {
    #[must_use]
    pub const fn from_presence(in_vector: bool, in_text: bool) -> Option<Self> {
        match (in_vector, in_text) {
            (true, true) => Some(Self::Hybrid),
            (true, false) => Some(Self::Vector),
            (false, true) => Some(Self::Text),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Text => "text",
            Self::Hybrid => "hybrid",
        }
    }
}

/// `(document_id, chunk_index)`, the identity of a piece of evidence.
pub type EvidenceKey = (String, u32);

/// One retrieved passage. Immutable once produced by retrieval.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceChunk {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub title: String,
    pub snippet_text: String,
    /// Native relevance on the 0..1 scale (vector similarity, else text score).
    pub similarity: f32,
    pub chunk_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub search_method: SearchMethod,
}

impl EvidenceChunk {
    #[must_use]
    pub fn key(&self) -> EvidenceKey {
        (self.document_id.clone(), self.chunk_index)
    }
}

/// Canonical evidence order: similarity desc, title asc, then identity for full determinism.
#[must_use]
pub fn evidence_order(a: &EvidenceChunk, b: &EvidenceChunk) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.document_id.cmp(&b.document_id))
        .then_with(|| a.chunk_index.cmp(&b.chunk_index))
}

/// One row of the reference table a draft may cite from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    /// 1-based, dense, never `"0"`.
    pub id: String,
    pub title: String,
    /// Snippet split into paragraphs, each paragraph a list of lines.
    pub snippet_lines: Vec<Vec<String>>,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub similarity_score: f32,
    pub chunk_index: u32,
}

impl ReferenceEntry {
    /// Snippet text reassembled from `snippet_lines`.
    #[must_use]
    pub fn snippet_text(&self) -> String {
        self.snippet_lines
            .iter()
            .map(|paragraph| paragraph.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Splits a snippet into blank-line separated paragraphs of trimmed, non-empty lines.
#[must_use]
pub fn split_snippet_lines(text: &str) -> Vec<Vec<String>> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(trimmed.to_string());
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// A citation actually present (and valid) in the final answer text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub index: String,
    pub cited_text: String,
    pub document_title: String,
    pub document_id: String,
    pub similarity_score: f32,
    pub chunk_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Cited evidence grouped per document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub document_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Citation indices belonging to this document, in citation order.
    pub citation_indices: Vec<String>,
    /// Cited snippets of this document joined by a separator.
    pub content: String,
    /// Maximum similarity among this document's citations.
    pub similarity_score: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMetadata {
    pub unique_documents: usize,
    pub citations_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Caller-facing result of answering one question.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<Source>,
    pub metadata: AnswerMetadata,
}

impl AnswerResult {
    #[must_use]
    pub fn new(answer: String, citations: Vec<Citation>, sources: Vec<Source>) -> Self {
        let metadata = AnswerMetadata {
            unique_documents: sources.len(),
            citations_count: citations.len(),
            timestamp: Utc::now(),
        };
        Self {
            answer,
            citations,
            sources,
            metadata,
        }
    }

    /// The fixed "nothing found" answer.
    #[must_use]
    pub fn no_evidence() -> Self {
        Self::new(NO_EVIDENCE_ANSWER.to_string(), Vec::new(), Vec::new())
    }
}
