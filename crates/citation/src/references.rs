use anyhow::{anyhow, Result};
use citeseek_protocol::{evidence_order, split_snippet_lines, EvidenceChunk, ReferenceEntry};

/// The numbered evidence table a draft cites from.
///
/// Ids are `"1"..="N"` in (similarity desc, title asc) order, so the same pool always yields
/// the same map regardless of the order it was gathered in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceMap {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceMap {
    #[must_use]
    pub fn build(pool: &[EvidenceChunk]) -> Self {
        let mut ordered: Vec<&EvidenceChunk> = pool.iter().collect();
        ordered.sort_by(|a, b| evidence_order(a, b));
        let entries = ordered
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| ReferenceEntry {
                id: (i + 1).to_string(),
                title: chunk.title.clone(),
                snippet_lines: split_snippet_lines(&chunk.snippet_text),
                document_id: chunk.document_id.clone(),
                url: chunk.url.clone(),
                filename: chunk.filename.clone(),
                similarity_score: chunk.similarity,
                chunk_index: chunk.chunk_index,
            })
            .collect();
        Self { entries }
    }

    /// Rebuilds a map from entries produced earlier, e.g. a saved reference table.
    ///
    /// Entries may come in any order but their ids must be exactly `"1".."N"`.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self> {
        let mut keyed = Vec::with_capacity(entries.len());
        for entry in entries {
            let id: usize = entry
                .id
                .parse()
                .map_err(|_| anyhow!("reference id {:?} is not a number", entry.id))?;
            keyed.push((id, entry));
        }
        keyed.sort_by_key(|(id, _)| *id);
        for (position, (id, _)) in keyed.iter().enumerate() {
            if *id != position + 1 {
                return Err(anyhow!(
                    "reference ids must be 1..={} without gaps, found {id} at position {}",
                    keyed.len(),
                    position + 1
                ));
            }
        }
        Ok(Self {
            entries: keyed.into_iter().map(|(_, entry)| entry).collect(),
        })
    }

    /// Entry for a 1-based id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&ReferenceEntry> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.entries.get(index)
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Valid ids as numbers, `1..=len`.
    #[must_use]
    pub fn ids(&self) -> Vec<u32> {
        (1..=self.entries.len())
            .filter_map(|id| u32::try_from(id).ok())
            .collect()
    }

    /// A map holding only the given old ids, renumbered `1..` in the order supplied.
    pub(crate) fn compacted(&self, old_ids: &[u32]) -> Self {
        let entries = old_ids
            .iter()
            .filter_map(|&old| self.get(old))
            .enumerate()
            .map(|(i, entry)| ReferenceEntry {
                id: (i + 1).to_string(),
                ..entry.clone()
            })
            .collect();
        Self { entries }
    }
}
