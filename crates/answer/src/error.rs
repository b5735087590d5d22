use citeseek_search::SearchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of the drafting collaborator.
#[derive(Error, Debug)]
pub enum DraftingError {
    #[error("Drafting request failed: {0}")]
    Request(String),

    #[error("Drafting service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Drafting service returned no text")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] SearchError),

    #[error("Retrieval timed out after {0} ms")]
    Timeout(u64),

    #[error("Drafting failed: {0}")]
    Drafting(#[from] DraftingError),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<SearchError> for PipelineError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Cancelled => Self::Cancelled,
            other => Self::Retrieval(other),
        }
    }
}
