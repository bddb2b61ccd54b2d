//! On-disk index snapshots.
//!
//! One deployment keeps exactly one snapshot at a fixed path. A snapshot is a
//! single JSON document holding the chunk texts, the vectors (base64 of
//! little-endian f32 bytes), and enough provenance to detect staleness:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "model": "paraphrase-multilingual-minilm-l12-v2",
//!   "dims": 384,
//!   "source_sha256": "9f2c…",
//!   "built_at": "2026-10-19T08:00:00+00:00",
//!   "chunks": ["…", "…"],
//!   "vectors": "AACAPwAAAEA…"
//! }
//! ```
//!
//! # Atomicity
//!
//! [`IndexStore::save`] writes to a temporary file in the snapshot's
//! directory and renames it over the destination, so readers observe either
//! the previous snapshot or the new one in full.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use guide_retrieval_core::embedding::{blob_to_vec, vec_to_blob};
use guide_retrieval_core::index::{FlatL2Index, IndexMetadata, RetrievalIndex};
use guide_retrieval_core::{Result, RetrievalError};

/// Current snapshot layout version. Bump when the layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    format_version: u32,
    model: String,
    dims: usize,
    source_sha256: String,
    built_at: String,
    chunks: Vec<String>,
    vectors: String,
}

/// Snapshot metadata, readable without decoding the vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub path: PathBuf,
    pub format_version: u32,
    pub model: String,
    pub dims: usize,
    pub chunk_count: usize,
    pub source_sha256: String,
    pub built_at: String,
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct SnapshotHeader {
    format_version: u32,
    model: String,
    dims: usize,
    source_sha256: String,
    built_at: String,
    chunks: Vec<String>,
}

/// Reads and writes the snapshot at one fixed path.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serialize `index` and atomically replace any previous snapshot.
    pub fn save(&self, index: &RetrievalIndex) -> Result<()> {
        let meta = index.metadata();
        let file = SnapshotFile {
            format_version: SNAPSHOT_FORMAT_VERSION,
            model: meta.model.clone(),
            dims: index.dims(),
            source_sha256: meta.source_sha256.clone(),
            built_at: meta.built_at.clone(),
            chunks: index.chunks().to_vec(),
            vectors: STANDARD.encode(vec_to_blob(index.vectors().as_flat())),
        };
        let bytes = serde_json::to_vec(&file).map_err(|e| self.corrupt(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&bytes).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            chunks = index.len(),
            bytes = bytes.len(),
            "index snapshot written"
        );
        Ok(())
    }

    /// Load the snapshot, or `Ok(None)` if none has been written yet.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Persistence`] when the file exists but cannot be read.
    /// - [`RetrievalError::IncompatibleSnapshot`] for another format version.
    /// - [`RetrievalError::CorruptSnapshot`] when the contents do not decode.
    pub fn load(&self) -> Result<Option<RetrievalIndex>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        self.check_version(&bytes)?;
        let file: SnapshotFile =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;

        let blob = STANDARD
            .decode(file.vectors.as_bytes())
            .map_err(|e| self.corrupt(format!("vectors are not valid base64: {}", e)))?;
        if blob.len() % 4 != 0 {
            return Err(self.corrupt(format!(
                "vector blob length {} is not a multiple of 4",
                blob.len()
            )));
        }
        let vectors = FlatL2Index::from_flat(file.dims, blob_to_vec(&blob))
            .map_err(|e| self.corrupt(e.to_string()))?;

        let metadata = IndexMetadata {
            model: file.model,
            source_sha256: file.source_sha256,
            built_at: file.built_at,
        };
        let index = RetrievalIndex::new(metadata, file.chunks, vectors)
            .map_err(|e| self.corrupt(e.to_string()))?;
        Ok(Some(index))
    }

    /// Read snapshot metadata without decoding vectors.
    pub fn stats(&self) -> Result<Option<SnapshotStats>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        self.check_version(&bytes)?;
        let header: SnapshotHeader =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;

        Ok(Some(SnapshotStats {
            path: self.path.clone(),
            format_version: header.format_version,
            model: header.model,
            dims: header.dims,
            chunk_count: header.chunks.len(),
            source_sha256: header.source_sha256,
            built_at: header.built_at,
            size_bytes: bytes.len() as u64,
        }))
    }

    /// Reject snapshots written with another layout before decoding the rest.
    fn check_version(&self, bytes: &[u8]) -> Result<()> {
        #[derive(Deserialize)]
        struct Version {
            format_version: Option<u32>,
        }
        let v: Version = serde_json::from_slice(bytes).map_err(|e| self.corrupt(e.to_string()))?;
        match v.format_version {
            Some(SNAPSHOT_FORMAT_VERSION) => Ok(()),
            Some(other) => Err(RetrievalError::IncompatibleSnapshot {
                path: self.path.clone(),
                reason: format!(
                    "format version {} (expected {})",
                    other, SNAPSHOT_FORMAT_VERSION
                ),
            }),
            None => Err(RetrievalError::IncompatibleSnapshot {
                path: self.path.clone(),
                reason: "missing format version".to_string(),
            }),
        }
    }

    fn io_error(&self, source: std::io::Error) -> RetrievalError {
        RetrievalError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: String) -> RetrievalError {
        RetrievalError::CorruptSnapshot {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> RetrievalIndex {
        let vectors = FlatL2Index::build(
            3,
            &[vec![1.0, 0.0, -1.5], vec![0.25, 2.0, 3.0]],
        )
        .unwrap();
        RetrievalIndex::new(
            IndexMetadata {
                model: "test-model".to_string(),
                source_sha256: "ab".repeat(32),
                built_at: "2026-10-19T08:00:00+00:00".to_string(),
            },
            vec!["Accès aux soins".to_string(), "Aide juridique".to_string()],
            vectors,
        )
        .unwrap()
    }

    #[test]
    fn test_load_absent_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("missing.json"));
        assert!(store.load().unwrap().is_none());
        assert!(store.stats().unwrap().is_none());
        assert!(!store.exists());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("nested/dir/index.json"));
        let index = sample_index();
        store.save(&index).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.chunks(), index.chunks());
        assert_eq!(loaded.len(), index.vectors().len());
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("index.json"));
        store.save(&sample_index()).unwrap();

        let replacement = RetrievalIndex::new(
            IndexMetadata {
                model: "test-model".to_string(),
                source_sha256: "cd".repeat(32),
                built_at: "2026-10-20T08:00:00+00:00".to_string(),
            },
            vec!["Hébergement d'urgence".to_string()],
            FlatL2Index::build(3, &[vec![0.0, 0.0, 1.0]]).unwrap(),
        )
        .unwrap();
        store.save(&replacement).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.chunks(), ["Hébergement d'urgence".to_string()]);
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary files must not remain");
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("index.json"));
        let empty = RetrievalIndex::new(
            IndexMetadata {
                model: "test-model".to_string(),
                source_sha256: String::new(),
                built_at: String::new(),
            },
            Vec::new(),
            FlatL2Index::empty(8),
        )
        .unwrap();
        store.save(&empty).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dims(), 8);
    }

    #[test]
    fn test_stats() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path().join("index.json"));
        store.save(&sample_index()).unwrap();
        let stats = store.stats().unwrap().unwrap();
        assert_eq!(stats.format_version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(stats.model, "test-model");
        assert_eq!(stats.dims, 3);
        assert_eq!(stats.chunk_count, 2);
        assert!(stats.size_bytes > 0);
    }

    #[test]
    fn test_other_version_is_incompatible() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, r#"{"format_version": 99, "chunks": []}"#).unwrap();
        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(err.requires_rebuild());

        std::fs::write(&path, r#"{"chunks": []}"#).unwrap();
        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RetrievalError::IncompatibleSnapshot { .. }));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, b"\x80\x04pickle").unwrap();
        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RetrievalError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_chunk_vector_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let blob = STANDARD.encode(vec_to_blob(&[1.0, 2.0]));
        let json = serde_json::json!({
            "format_version": SNAPSHOT_FORMAT_VERSION,
            "model": "m",
            "dims": 2,
            "source_sha256": "",
            "built_at": "",
            "chunks": ["one", "two"],
            "vectors": blob,
        });
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RetrievalError::CorruptSnapshot { .. }));
    }
}
