//! Persistent chunk index with brute-force cosine similarity search.
//!
//! The whole index lives in memory behind an `RwLock` and is written to a
//! single JSON file on [`KnowledgeIndex::save`]. Search is O(n), which is
//! fine for a support knowledge base of a few thousand chunks.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_llm::DynEmbeddingService;

/// File name of the persisted index inside the index directory.
pub const INDEX_FILE: &str = "index.json";

/// An embedded slice of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    /// File name of the document this chunk came from.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a search, with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// The embedder an index's vectors came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderSignature {
    pub model: String,
    pub dimensions: Option<usize>,
}

impl EmbedderSignature {
    pub fn of(embedder: &dyn DynEmbeddingService) -> Self {
        Self {
            model: embedder.model_name(),
            dimensions: embedder.dimensions(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    collection: String,
    #[serde(default)]
    embedder: Option<EmbedderSignature>,
    chunks: Vec<Chunk>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeIndex {
    collection: String,
    path: Option<PathBuf>,
    embedder: Option<EmbedderSignature>,
    /// Set when the persisted chunks were discarded and must be rebuilt.
    stale: Arc<AtomicBool>,
    entries: Arc<RwLock<HashMap<Uuid, Chunk>>>,
}

impl KnowledgeIndex {
    /// An empty index that is never written to disk.
    pub fn in_memory(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            path: None,
            embedder: None,
            stale: Arc::new(AtomicBool::new(false)),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load the index persisted in `index_dir`, or start an empty one there.
    ///
    /// A persisted index built by a different embedder is not loaded; the
    /// index starts empty and [`needs_rebuild`](Self::needs_rebuild) is set.
    pub fn open(
        index_dir: &Path,
        collection: impl Into<String>,
        embedder: EmbedderSignature,
    ) -> Result<Self> {
        let path = index_dir.join(INDEX_FILE);
        let mut index = Self::in_memory(collection);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let persisted: PersistedIndex = serde_json::from_str(&content)
                .map_err(|e| HelpdeskError::Index(format!("{}: {}", path.display(), e)))?;
            if persisted.embedder.as_ref() == Some(&embedder) {
                let entries = persisted.chunks.into_iter().map(|c| (c.id, c)).collect();
                index.entries = Arc::new(RwLock::new(entries));
                info!(path = %path.display(), chunks = index.count(), "Knowledge index loaded");
            } else {
                warn!(
                    path = %path.display(),
                    built_with = ?persisted.embedder,
                    current = ?embedder,
                    "Knowledge index was built by another embedder, rebuilding"
                );
                index.stale.store(true, Ordering::SeqCst);
            }
        }

        index.path = Some(path);
        index.embedder = Some(embedder);
        Ok(index)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether a persisted copy of this index exists on disk.
    pub fn is_persisted(&self) -> bool {
        self.path.as_ref().is_some_and(|p| p.exists())
    }

    /// True until a usable index has been saved: nothing on disk yet, or
    /// the persisted chunks came from another embedder.
    pub fn needs_rebuild(&self) -> bool {
        !self.is_persisted() || self.stale.load(Ordering::SeqCst)
    }

    /// Insert chunks, replacing any with the same id.
    pub fn upsert(&self, chunks: Vec<Chunk>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HelpdeskError::Index(format!("Lock poisoned: {}", e)))?;
        for chunk in chunks {
            entries.insert(chunk.id, chunk);
        }
        Ok(())
    }

    /// The `k` chunks most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HelpdeskError::Index(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<ScoredChunk> = entries
            .values()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.source.cmp(&b.chunk.source))
                .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Remove every chunk that came from `source`. Returns how many were removed.
    pub fn remove_source(&self, source: &str) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HelpdeskError::Index(format!("Lock poisoned: {}", e)))?;
        let before = entries.len();
        entries.retain(|_, chunk| chunk.source != source);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(source, removed, "Removed chunks for source");
        }
        Ok(removed)
    }

    /// Distinct source file names present in the index.
    pub fn sources(&self) -> BTreeSet<String> {
        self.entries
            .read()
            .map(|e| e.values().map(|c| c.source.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Persist the index. A no-op for in-memory indexes.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let chunks: Vec<Chunk> = {
            let entries = self
                .entries
                .read()
                .map_err(|e| HelpdeskError::Index(format!("Lock poisoned: {}", e)))?;
            let mut chunks: Vec<Chunk> = entries.values().cloned().collect();
            chunks.sort_by(|a, b| {
                a.source
                    .cmp(&b.source)
                    .then_with(|| a.chunk_index.cmp(&b.chunk_index))
            });
            chunks
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedIndex {
            collection: self.collection.clone(),
            embedder: self.embedder.clone(),
            chunks,
        };
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&persisted)?)?;
        std::fs::rename(&tmp, path)?;
        self.stale.store(false, Ordering::SeqCst);
        debug!(path = %path.display(), chunks = persisted.chunks.len(), "Knowledge index saved");
        Ok(())
    }
}

/// Cosine similarity, 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
