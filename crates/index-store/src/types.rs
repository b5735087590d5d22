use serde::{Deserialize, Serialize};

/// Metadata stored next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub document_id: String,
    pub chunk_index: u32,
    pub chunk_text: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Document collection the chunk belongs to (user-facing grouping, not the index name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// A point returned by any store operation. `score` is on the 0..1 scale for vector and text
/// search and `1.0` for scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Restricts every store operation to a subset of the corpus. Empty fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl ScopeFilter {
    #[must_use]
    pub fn for_documents(document_ids: Vec<String>) -> Self {
        Self {
            document_ids,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        if !self.collection_ids.is_empty() {
            let Some(collection) = payload.collection_id.as_deref() else {
                return false;
            };
            if !self.collection_ids.iter().any(|c| c == collection) {
                return false;
            }
        }
        if let Some(owner) = self.owner_id.as_deref() {
            if payload.owner_id.as_deref() != Some(owner) {
                return false;
            }
        }
        if !self.document_ids.is_empty()
            && !self.document_ids.iter().any(|d| d == &payload.document_id)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSearchParams {
    pub limit: usize,
    /// Minimum cosine similarity a point must reach.
    pub threshold: f32,
}
