use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Index store error: {0}")]
    Store(#[from] citeseek_index_store::IndexStoreError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("Retrieval cancelled")]
    Cancelled,
}
