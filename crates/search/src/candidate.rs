use citeseek_index_store::ScoredPoint;
use citeseek_protocol::{EvidenceChunk, SearchMethod};

/// Evidence plus fusion bookkeeping. Only lives between fusion and document grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk: EvidenceChunk,
    /// Score before the confidence multiplier (RRF sum, or linear combination).
    pub raw_rank_score: f32,
    pub original_vector_score: Option<f32>,
    pub original_text_score: Option<f32>,
    pub confidence: f32,
    /// Ranking score: `raw_rank_score * confidence`.
    pub final_score: f32,
}

impl ScoredCandidate {
    #[must_use]
    pub fn search_method(&self) -> SearchMethod {
        self.chunk.search_method
    }

    #[must_use]
    pub fn is_vector_only(&self) -> bool {
        self.chunk.search_method == SearchMethod::Vector
    }
}

/// Builds the immutable evidence record for a point seen by one or both lists.
pub(crate) fn evidence_from_point(
    point: &ScoredPoint,
    vector_score: Option<f32>,
    text_score: Option<f32>,
) -> Option<EvidenceChunk> {
    let method = SearchMethod::from_presence(vector_score.is_some(), text_score.is_some())?;
    let similarity = vector_score.or(text_score).unwrap_or(0.0);
    let payload = &point.payload;
    Some(EvidenceChunk {
        document_id: payload.document_id.clone(),
        url: payload.url.clone(),
        filename: payload.filename.clone(),
        title: payload.title.clone(),
        snippet_text: payload.chunk_text.clone(),
        similarity,
        chunk_index: payload.chunk_index,
        page_number: payload.page_number,
        search_method: method,
    })
}

/// A document-level search hit: its best candidate and the chunk previews behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHit {
    pub document_id: String,
    pub title: String,
    /// Best `final_score` among the document's candidates.
    pub score: f32,
    /// Highest-ranked candidate, the document's primary excerpt.
    pub primary: ScoredCandidate,
    /// Chunk previews in rank order (primary first). May be empty.
    pub previews: Vec<ScoredCandidate>,
}

/// Groups ranked candidates by document, keeping rank order of first appearance.
pub(crate) fn group_by_document(
    ranked: Vec<ScoredCandidate>,
    max_previews: usize,
) -> Vec<DocumentHit> {
    let mut hits: Vec<DocumentHit> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for candidate in ranked {
        let doc_id = candidate.chunk.document_id.clone();
        match index.get(&doc_id) {
            Some(&pos) => {
                let hit = &mut hits[pos];
                if hit.previews.len() < max_previews {
                    hit.previews.push(candidate);
                }
            }
            None => {
                index.insert(doc_id.clone(), hits.len());
                let previews = if max_previews > 0 {
                    vec![candidate.clone()]
                } else {
                    Vec::new()
                };
                hits.push(DocumentHit {
                    document_id: doc_id,
                    title: candidate.chunk.title.clone(),
                    score: candidate.final_score,
                    primary: candidate,
                    previews,
                });
            }
        }
    }
    hits
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use citeseek_index_store::ChunkPayload;

    pub fn point(doc: &str, chunk: u32, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: format!("{doc}:{chunk}"),
            score,
            payload: ChunkPayload {
                document_id: doc.to_string(),
                chunk_index: chunk,
                chunk_text: format!("text of {doc} chunk {chunk}"),
                title: format!("Title {doc}"),
                url: None,
                filename: None,
                page_number: None,
                collection_id: None,
                owner_id: None,
            },
        }
    }

    pub fn candidate(doc: &str, chunk: u32, final_score: f32) -> ScoredCandidate {
        let chunk = evidence_from_point(&point(doc, chunk, 0.5), Some(0.5), None).unwrap();
        ScoredCandidate {
            chunk,
            raw_rank_score: final_score,
            original_vector_score: Some(0.5),
            original_text_score: None,
            confidence: 1.0,
            final_score,
        }
    }
}
