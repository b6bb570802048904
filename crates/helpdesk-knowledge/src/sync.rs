//! Knowledge base synchronization.
//!
//! On every [`KnowledgeBase::sync`]:
//! 1. Fingerprint the supported files of the documents directory
//! 2. Reuse the persisted index untouched when nothing changed
//! 3. Otherwise re-load, split and embed each changed document, replacing
//!    its previous chunks, and drop chunks of documents that disappeared
//! 4. Record fingerprints and persist both the index and the tracker

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use helpdesk_core::config::KnowledgeConfig;
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_llm::DynEmbeddingService;

use crate::chunker::TextSplitter;
use crate::index::{Chunk, EmbedderSignature, KnowledgeIndex, ScoredChunk, INDEX_FILE};
use crate::loader::load_document;
use crate::tracker::{DocumentTracker, ScannedFile};

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Supported files found in the documents directory.
    pub scanned: usize,
    /// Documents that were (re-)indexed.
    pub processed: Vec<String>,
    /// Documents that could not be loaded or embedded; retried next time.
    pub failed: Vec<String>,
    /// Documents no longer on disk whose chunks were dropped.
    pub removed_sources: Vec<String>,
    pub chunks_added: usize,
    pub chunks_removed: usize,
    /// True when the existing index was reused without changes.
    pub reused: bool,
}

/// Snapshot of the knowledge base for status output.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub collection_name: String,
    pub chunk_count: usize,
    pub source_count: usize,
    pub documents_dir: String,
    pub index_dir: String,
}

/// The document index together with everything needed to keep it current.
pub struct KnowledgeBase {
    index: KnowledgeIndex,
    tracker: Mutex<DocumentTracker>,
    embedder: Arc<dyn DynEmbeddingService>,
    splitter: TextSplitter,
    documents_dir: PathBuf,
    index_dir: PathBuf,
}

impl KnowledgeBase {
    /// Open the index and tracker stored in `index_dir`.
    ///
    /// An unreadable index is set aside as `index.json.corrupt`; the next
    /// sync then rebuilds everything. So does an index built by a different
    /// embedder model or dimensionality.
    pub fn open(
        config: &KnowledgeConfig,
        documents_dir: PathBuf,
        index_dir: PathBuf,
        embedder: Arc<dyn DynEmbeddingService>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&index_dir)?;

        let signature = EmbedderSignature::of(embedder.as_ref());
        let opened = KnowledgeIndex::open(&index_dir, &config.collection_name, signature.clone());
        let index = match opened {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable knowledge index");
                let path = index_dir.join(INDEX_FILE);
                std::fs::rename(&path, path.with_extension("json.corrupt"))?;
                KnowledgeIndex::open(&index_dir, &config.collection_name, signature)?
            }
        };
        let tracker = DocumentTracker::in_dir(&index_dir);

        Ok(Self {
            index,
            tracker: Mutex::new(tracker),
            embedder,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            documents_dir,
            index_dir,
        })
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Bring the index in line with the documents directory.
    pub async fn sync(&self) -> Result<SyncReport> {
        let mut tracker = self.tracker.lock().await;
        let first_run = self.index.needs_rebuild();

        let dir = self.documents_dir.clone();
        let files = tokio::task::spawn_blocking(move || DocumentTracker::inventory(&dir))
            .await
            .map_err(|e| HelpdeskError::Index(format!("document scan task failed: {e}")))??;

        let mut report = SyncReport {
            scanned: files.len(),
            ..SyncReport::default()
        };

        let changed: Vec<&ScannedFile> = files
            .iter()
            .filter(|f| first_run || tracker.is_changed(f))
            .collect();
        let present: HashSet<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        let vanished: Vec<String> = self
            .index
            .sources()
            .into_iter()
            .filter(|source| !present.contains(source.as_str()))
            .collect();

        if !first_run && changed.is_empty() && vanished.is_empty() {
            info!(
                documents = files.len(),
                chunks = self.index.count(),
                "Documents unchanged, reusing knowledge index"
            );
            report.reused = true;
            return Ok(report);
        }

        for source in vanished {
            report.chunks_removed += self.index.remove_source(&source)?;
            report.removed_sources.push(source);
        }

        let mut skipped = HashSet::new();
        for file in changed {
            match self.build_chunks(file).await {
                Ok(chunks) => {
                    report.chunks_removed += self.index.remove_source(&file.filename)?;
                    report.chunks_added += chunks.len();
                    self.index.upsert(chunks)?;
                    report.processed.push(file.filename.clone());
                }
                Err(e) => {
                    warn!(file = %file.filename, error = %e, "Skipping document");
                    skipped.insert(file.filename.clone());
                    report.failed.push(file.filename.clone());
                }
            }
        }

        self.index.save()?;
        tracker.record_files(&files, &skipped);
        tracker.save()?;

        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            removed = report.removed_sources.len(),
            chunks_added = report.chunks_added,
            chunks_removed = report.chunks_removed,
            total_chunks = self.index.count(),
            "Knowledge base synchronized"
        );
        Ok(report)
    }

    /// Load, split and embed one document. Nothing is written to the index.
    async fn build_chunks(&self, file: &ScannedFile) -> Result<Vec<Chunk>> {
        let path = file.path.clone();
        let text = tokio::task::spawn_blocking(move || load_document(&path))
            .await
            .map_err(|e| HelpdeskError::Document(format!("loader task failed: {e}")))??;

        let pieces = self.splitter.split(&text);
        let mut chunks = Vec::with_capacity(pieces.len());
        for (chunk_index, piece) in pieces.into_iter().enumerate() {
            let embedding = self.embedder.embed_boxed(&piece).await?;
            chunks.push(Chunk {
                id: Uuid::new_v4(),
                source: file.filename.clone(),
                chunk_index,
                text: piece,
                embedding,
            });
        }
        Ok(chunks)
    }

    /// The `k` chunks most relevant to `text`. An empty index returns nothing
    /// without calling the embedder.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_boxed(text).await?;
        self.index.search(&vector, k)
    }

    pub fn count(&self) -> usize {
        self.index.count()
    }

    pub fn stats(&self) -> KnowledgeStats {
        KnowledgeStats {
            collection_name: self.index.collection().to_string(),
            chunk_count: self.index.count(),
            source_count: self.index.sources().len(),
            documents_dir: self.documents_dir.display().to_string(),
            index_dir: self.index_dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_llm::HashEmbedding;

    struct Fixture {
        docs: tempfile::TempDir,
        state: tempfile::TempDir,
        config: KnowledgeConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                docs: tempfile::tempdir().unwrap(),
                state: tempfile::tempdir().unwrap(),
                config: KnowledgeConfig {
                    chunk_size: 60,
                    chunk_overlap: 10,
                    ..KnowledgeConfig::default()
                },
            }
        }

        fn write(&self, name: &str, content: &str) {
            std::fs::write(self.docs.path().join(name), content).unwrap();
        }

        fn open(&self) -> KnowledgeBase {
            self.open_with(HashEmbedding::new(32))
        }

        fn open_with(&self, embedder: HashEmbedding) -> KnowledgeBase {
            KnowledgeBase::open(
                &self.config,
                self.docs.path().to_path_buf(),
                self.state.path().to_path_buf(),
                Arc::new(embedder),
            )
            .unwrap()
        }
    }

    #[tokio::test]
    async fn test_first_sync_indexes_everything() {
        let fx = Fixture::new();
        fx.write("policy.txt", "Refunds are accepted within 30 days of purchase.");
        fx.write("hours.txt", "Support is available from 9am to 5pm on weekdays.");
        fx.write("ignored.md", "not indexed");

        let kb = fx.open();
        let report = kb.sync().await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.processed, vec!["hours.txt", "policy.txt"]);
        assert!(!report.reused);
        assert_eq!(kb.count(), 2);
        assert_eq!(kb.stats().source_count, 2);
    }

    #[tokio::test]
    async fn test_second_sync_reuses_index() {
        let fx = Fixture::new();
        fx.write("policy.txt", "Refunds are accepted within 30 days of purchase.");
        fx.open().sync().await.unwrap();

        let kb = fx.open();
        assert_eq!(kb.count(), 1);
        let report = kb.sync().await.unwrap();
        assert!(report.reused);
        assert!(report.processed.is_empty());
    }

    #[tokio::test]
    async fn test_modified_document_replaces_its_chunks() {
        let fx = Fixture::new();
        fx.write("policy.txt", "Refunds within 30 days.");
        fx.write("hours.txt", "Open 9 to 5.");
        let kb = fx.open();
        kb.sync().await.unwrap();

        fx.write("policy.txt", "Refunds within 60 days. Store credit after that.");
        let report = kb.sync().await.unwrap();
        assert_eq!(report.processed, vec!["policy.txt"]);
        assert_eq!(report.chunks_removed, 1);

        let texts: Vec<String> = kb
            .query("anything", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|hit| hit.chunk.text)
            .collect();
        assert!(texts.iter().any(|t| t.contains("60 days")));
        assert!(!texts.iter().any(|t| t.contains("30 days")));
        assert!(texts.iter().any(|t| t.contains("9 to 5")));
    }

    #[tokio::test]
    async fn test_deleted_document_chunks_are_dropped() {
        let fx = Fixture::new();
        fx.write("a.txt", "alpha");
        fx.write("b.txt", "bravo");
        let kb = fx.open();
        kb.sync().await.unwrap();

        std::fs::remove_file(fx.docs.path().join("b.txt")).unwrap();
        let report = kb.sync().await.unwrap();
        assert_eq!(report.removed_sources, vec!["b.txt"]);
        assert_eq!(kb.count(), 1);
    }

    #[tokio::test]
    async fn test_unloadable_document_is_skipped_and_retried() {
        let fx = Fixture::new();
        fx.write("good.txt", "readable");
        fx.write("broken.docx", "this is not a zip archive");
        let kb = fx.open();

        let first = kb.sync().await.unwrap();
        assert_eq!(first.processed, vec!["good.txt"]);
        assert_eq!(first.failed, vec!["broken.docx"]);

        let second = kb.sync().await.unwrap();
        assert!(!second.reused);
        assert_eq!(second.failed, vec!["broken.docx"]);
        assert!(second.processed.is_empty());
    }

    #[tokio::test]
    async fn test_long_document_is_chunked() {
        let fx = Fixture::new();
        let body = (0..40).map(|i| format!("sentence{i}")).collect::<Vec<_>>().join(" ");
        fx.write("long.txt", &body);
        let kb = fx.open();
        let report = kb.sync().await.unwrap();
        assert!(report.chunks_added > 1);
        assert_eq!(kb.count(), report.chunks_added);
    }

    #[tokio::test]
    async fn test_query_on_empty_index_returns_nothing() {
        let fx = Fixture::new();
        let kb = fx.open();
        kb.sync().await.unwrap();
        assert!(kb.query("refunds", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_rebuilt() {
        let fx = Fixture::new();
        fx.write("policy.txt", "Refunds within 30 days.");
        fx.open().sync().await.unwrap();
        std::fs::write(fx.state.path().join(crate::index::INDEX_FILE), "garbage").unwrap();

        let kb = fx.open();
        assert_eq!(kb.count(), 0);
        let report = kb.sync().await.unwrap();
        assert_eq!(report.processed, vec!["policy.txt"]);
        assert_eq!(kb.count(), 1);
    }

    #[tokio::test]
    async fn test_embedder_change_rebuilds_index() {
        let fx = Fixture::new();
        fx.write("policy.txt", "Refunds are accepted within 30 days of purchase.");
        fx.write("hours.txt", "Support is available from 9am to 5pm on weekdays.");
        fx.open_with(HashEmbedding::new(32)).sync().await.unwrap();

        let kb = fx.open_with(HashEmbedding::new(16));
        assert_eq!(kb.count(), 0);
        let report = kb.sync().await.unwrap();
        assert!(!report.reused);
        assert_eq!(report.processed, vec!["hours.txt", "policy.txt"]);

        let hits = kb.query("Refunds are accepted within 30 days of purchase.", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.chunk.embedding.len() == 16));
        assert!((hits[0].score - 1.0).abs() < 1e-6);

        // Once rebuilt, the same embedder reuses it.
        let again = fx.open_with(HashEmbedding::new(16)).sync().await.unwrap();
        assert!(again.reused);
    }
}
