use citeseek_protocol::{Citation, Source};
use std::collections::HashMap;

/// Grouping key; ids and titles never collide with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SourceKey<'a> {
    Document(&'a str),
    Title(&'a str),
}

impl<'a> SourceKey<'a> {
    fn of(citation: &'a Citation) -> Self {
        if citation.document_id.is_empty() {
            Self::Title(&citation.document_title)
        } else {
            Self::Document(&citation.document_id)
        }
    }
}

/// Groups citations into one source per document, in order of first citation.
///
/// Documents are keyed by `document_id`, or by title when the id is empty. A source keeps the
/// highest similarity of its citations and joins their excerpts with `separator`.
#[must_use]
pub fn group_sources(citations: &[Citation], separator: &str) -> Vec<Source> {
    let mut positions: HashMap<SourceKey<'_>, usize> = HashMap::new();
    let mut sources: Vec<Source> = Vec::new();
    let mut excerpts: Vec<Vec<&str>> = Vec::new();

    for citation in citations {
        let position = *positions.entry(SourceKey::of(citation)).or_insert_with(|| {
            sources.push(Source {
                document_id: citation.document_id.clone(),
                title: citation.document_title.clone(),
                url: citation.url.clone(),
                filename: citation.filename.clone(),
                citation_indices: Vec::new(),
                content: String::new(),
                similarity_score: citation.similarity_score,
            });
            excerpts.push(Vec::new());
            sources.len() - 1
        });

        let source = &mut sources[position];
        source.citation_indices.push(citation.index.clone());
        source.similarity_score = source.similarity_score.max(citation.similarity_score);
        if source.url.is_none() {
            source.url = citation.url.clone();
        }
        if source.filename.is_none() {
            source.filename = citation.filename.clone();
        }
        excerpts[position].push(citation.cited_text.as_str());
    }

    for (source, parts) in sources.iter_mut().zip(excerpts) {
        source.content = parts.join(separator);
    }
    sources
}
