//! Document change tracking.
//!
//! Each supported file is fingerprinted by a SHA-256 of its bytes and
//! recorded under the key `"{filename}_{size}"`. A file is considered
//! changed when its key is unknown or the stored hash differs.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use helpdesk_core::error::{HelpdeskError, Result};

use crate::loader::is_supported;

/// File name of the persisted tracker inside the index directory.
pub const TRACKER_FILE: &str = "document_tracker.json";

/// Persisted fingerprint of one processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub hash: String,
    pub filename: String,
    pub last_processed: DateTime<Utc>,
    pub size: u64,
}

/// A supported file found on disk, with its current fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub hash: String,
}

impl ScannedFile {
    pub fn key(&self) -> String {
        format!("{}_{}", self.filename, self.size)
    }
}

/// Fingerprint store backed by a JSON file.
#[derive(Debug)]
pub struct DocumentTracker {
    path: PathBuf,
    entries: BTreeMap<String, FingerprintEntry>,
}

impl DocumentTracker {
    /// Load the tracker at `path`. A missing or unreadable file yields an
    /// empty tracker, which marks every document as changed.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt document tracker, starting fresh");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "Document tracker loaded");
        Self { path, entries }
    }

    /// Tracker stored as [`TRACKER_FILE`] inside `index_dir`.
    pub fn in_dir(index_dir: &Path) -> Self {
        Self::open(index_dir.join(TRACKER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &BTreeMap<String, FingerprintEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fingerprint every supported file directly inside `dir`, sorted by
    /// name. A missing directory is created and yields nothing.
    pub fn inventory(dir: &Path) -> Result<Vec<ScannedFile>> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "Created empty documents directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;
            if !metadata.is_file() || !is_supported(&path) {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            files.push(ScannedFile {
                hash: file_hash(&path)?,
                size: metadata.len(),
                filename,
                path,
            });
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    pub fn is_changed(&self, file: &ScannedFile) -> bool {
        self.entries
            .get(&file.key())
            .map_or(true, |entry| entry.hash != file.hash)
    }

    /// Paths of supported files in `dir` that are new or modified.
    pub fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(Self::inventory(dir)?
            .into_iter()
            .filter(|f| self.is_changed(f))
            .map(|f| f.path)
            .collect())
    }

    /// Record every supported file currently in `dir` as processed.
    pub fn record(&mut self, dir: &Path) -> Result<()> {
        let files = Self::inventory(dir)?;
        self.record_files(&files, &HashSet::new());
        Ok(())
    }

    /// Update fingerprints for `present` files, except those named in
    /// `skipped`, and forget files that are no longer present.
    ///
    /// Skipped files keep whatever entry they had, so they are retried on
    /// the next scan.
    pub fn record_files(&mut self, present: &[ScannedFile], skipped: &HashSet<String>) {
        let now = Utc::now();
        let names: HashSet<&str> = present.iter().map(|f| f.filename.as_str()).collect();
        self.entries
            .retain(|_, entry| names.contains(entry.filename.as_str()));

        for file in present {
            if skipped.contains(&file.filename) {
                continue;
            }
            let key = file.key();
            self.entries
                .retain(|k, entry| entry.filename != file.filename || *k == key);
            self.entries.insert(
                key,
                FingerprintEntry {
                    hash: file.hash.clone(),
                    filename: file.filename.clone(),
                    last_processed: now,
                    size: file.size,
                },
            );
        }
    }

    /// Write the tracker to disk, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "Document tracker saved");
        Ok(())
    }
}

/// Hex SHA-256 of a file's contents.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| {
        HelpdeskError::Document(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
