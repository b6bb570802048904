//! Helpdesk knowledge crate - document tracking, chunking, indexing and
//! retrieval-augmented answering.
//!
//! [`KnowledgeBase::sync`] keeps the persisted index in step with a
//! directory of documents, re-embedding only files whose content changed.
//! [`RetrievalAnswerer`] answers questions strictly from indexed chunks.

pub mod chunker;
pub mod index;
pub mod loader;
pub mod retrieval;
pub mod sync;
pub mod tracker;

pub use chunker::TextSplitter;
pub use index::{Chunk, EmbedderSignature, KnowledgeIndex, ScoredChunk};
pub use loader::{is_supported, load_document, SUPPORTED_EXTENSIONS};
pub use retrieval::RetrievalAnswerer;
pub use sync::{KnowledgeBase, KnowledgeStats, SyncReport};
pub use tracker::{DocumentTracker, FingerprintEntry, ScannedFile};
