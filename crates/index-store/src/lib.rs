//! # Citeseek Index Store
//!
//! The seam between retrieval and whatever engine actually holds the chunk vectors and text.
//!
//! ## Features
//!
//! - **`IndexStore` trait**: vector search, text search and scroll over scoped chunk points
//! - **`Embedder` trait**: query/chunk embedding collaborator
//! - **`MemoryIndexStore`**: brute-force in-process implementation
//! - **`DocumentCorpus`**: JSON corpus loader feeding the in-memory store
//!
//! ## Example
//!
//! ```no_run
//! use citeseek_index_store::{DocumentCorpus, HashingEmbedder, IndexStore, ScopeFilter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = HashingEmbedder::default();
//!     let store = DocumentCorpus::load("corpus.json")
//!         .await?
//!         .into_store(&embedder, "chunks")
//!         .await?;
//!
//!     let hits = store
//!         .text_search("chunks", "groundwater", &ScopeFilter::default(), 10)
//!         .await?;
//!     for hit in hits {
//!         println!("{}: {:.3}", hit.payload.title, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod corpus;
mod embeddings;
mod error;
mod store;
mod types;

pub use corpus::{CorpusChunk, CorpusDocument, DocumentCorpus, DOCUMENT_CORPUS_SCHEMA_VERSION};
pub use embeddings::{cosine_similarity, Embedder, HashingEmbedder};
pub use error::{IndexStoreError, Result};
pub use store::{IndexStore, MemoryIndexStore, StoredPoint};
pub use types::{ChunkPayload, ScopeFilter, ScoredPoint, VectorSearchParams};
