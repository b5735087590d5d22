use crate::references::ReferenceMap;
use crate::scan::scan_citations;
use std::collections::HashMap;

/// One piece of a tokenized draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// A `[n]` token. `renumbered` is `None` when `original` names no reference.
    Citation {
        original: u32,
        renumbered: Option<u32>,
    },
}

/// A draft whose valid citations were renumbered by first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Renumbered {
    pub segments: Vec<Segment>,
    /// The reference map restricted to cited entries, ids matching the renumbered text.
    pub references: ReferenceMap,
    /// `(old id, new id)` in first-appearance order.
    pub mapping: Vec<(u32, u32)>,
    /// Size of the reference map the draft was written against.
    pub available: usize,
}

impl Renumbered {
    /// Renumbered text; invalid tokens are kept as written.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Citation {
                    renumbered: Some(id),
                    ..
                } => format!("[{id}]"),
                Segment::Citation { original, .. } => format!("[{original}]"),
            })
            .collect()
    }

    /// Distinct new ids in ascending order, which is also first-appearance order.
    #[must_use]
    pub fn cited_ids(&self) -> Vec<u32> {
        self.mapping.iter().map(|&(_, new)| new).collect()
    }
}

/// Renumbers the valid citations of `text` to `1..=M` in order of first appearance.
///
/// Tokens are rewritten from their scanned spans in a single pass, so a new id can never be
/// mistaken for another old one.
#[must_use]
pub fn renumber(text: &str, references: &ReferenceMap) -> Renumbered {
    let mut new_ids: HashMap<u32, u32> = HashMap::new();
    let mut mapping: Vec<(u32, u32)> = Vec::new();
    let mut segments = Vec::new();
    let mut cursor = 0;

    for span in scan_citations(text) {
        if span.start > cursor {
            segments.push(Segment::Text(text[cursor..span.start].to_string()));
        }
        let renumbered = if references.contains(span.id) {
            let next = u32::try_from(mapping.len() + 1).unwrap_or(u32::MAX);
            let id = *new_ids.entry(span.id).or_insert_with(|| {
                mapping.push((span.id, next));
                next
            });
            Some(id)
        } else {
            None
        };
        segments.push(Segment::Citation {
            original: span.id,
            renumbered,
        });
        cursor = span.end;
    }
    if cursor < text.len() {
        segments.push(Segment::Text(text[cursor..].to_string()));
    }

    let old_ids: Vec<u32> = mapping.iter().map(|&(old, _)| old).collect();
    log::debug!(
        "Renumbered {} cited references out of {}",
        mapping.len(),
        references.len()
    );
    Renumbered {
        segments,
        references: references.compacted(&old_ids),
        mapping,
        available: references.len(),
    }
}
