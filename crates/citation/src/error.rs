use thiserror::Error;

/// A citation in a draft that does not resolve to a reference entry.
///
/// These are reported, never raised: the answer is still produced with the offending
/// marker removed, and callers decide whether to ask for a repaired draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CitationIssue {
    #[error("Citation [0] is not a valid reference id")]
    ZeroCitation,

    #[error("Citation [{id}] is out of range (1..={max})")]
    OutOfRange { id: u32, max: usize },
}

impl CitationIssue {
    /// The cited id as written in the draft.
    #[must_use]
    pub const fn cited_id(&self) -> u32 {
        match self {
            Self::ZeroCitation => 0,
            Self::OutOfRange { id, .. } => *id,
        }
    }
}
