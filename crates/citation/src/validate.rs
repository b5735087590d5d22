use crate::config::CitationConfig;
use crate::error::CitationIssue;
use crate::renumber::{Renumbered, Segment};
use citeseek_protocol::Citation;

/// Final answer text plus the citations it actually contains.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAnswer {
    pub answer: String,
    /// One per distinct valid id, in id order.
    pub citations: Vec<Citation>,
    pub issues: Vec<CitationIssue>,
}

/// Replaces valid tokens by the configured marker and removes the invalid ones.
///
/// Every removed token is reported as a [`CitationIssue`]. The `citations` list covers
/// exactly the ids left in `answer`.
#[must_use]
pub fn validate_citations(renumbered: &Renumbered, config: &CitationConfig) -> ValidatedAnswer {
    let max = renumbered.available;
    let mut answer = String::new();
    let mut issues = Vec::new();

    for segment in &renumbered.segments {
        match segment {
            Segment::Text(text) => answer.push_str(text),
            Segment::Citation {
                renumbered: Some(id),
                ..
            } => answer.push_str(&config.render_marker(*id)),
            Segment::Citation { original: 0, .. } => issues.push(CitationIssue::ZeroCitation),
            Segment::Citation { original, .. } => {
                issues.push(CitationIssue::OutOfRange { id: *original, max });
            }
        }
    }

    if !issues.is_empty() {
        log::warn!(
            "Removed {} invalid citation(s) from draft: {}",
            issues.len(),
            issues
                .iter()
                .map(|issue| format!("[{}]", issue.cited_id()))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let citations = renumbered
        .references
        .entries()
        .iter()
        .map(|entry| Citation {
            index: entry.id.clone(),
            cited_text: entry.snippet_text(),
            document_title: entry.title.clone(),
            document_id: entry.document_id.clone(),
            similarity_score: entry.similarity_score,
            chunk_index: entry.chunk_index,
            filename: entry.filename.clone(),
            url: entry.url.clone(),
        })
        .collect();

    ValidatedAnswer {
        answer: answer.trim().to_string(),
        citations,
        issues,
    }
}
