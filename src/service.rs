//! Retrieval service: builds the guide index and answers queries against it.
//!
//! The service is an explicit context object, constructed once per
//! deployment and shared (behind an `Arc`) by request handlers. It moves
//! between two states:
//!
//! - **Unloaded**: no index in memory.
//! - **Ready**: an index is published and queries search it.
//! - **Unavailable**: the snapshot on disk is corrupt or stale and cannot
//!   be rebuilt. Queries fail fast without rereading it until the next
//!   successful build.
//!
//! # Build path
//!
//! ```text
//! extract → chunk → embed (batched, time-bounded) → FlatL2Index → save → publish
//! ```
//!
//! The new index is built entirely off to the side and published with a
//! single pointer swap, so in-flight queries see either the old index or the
//! new one, never a partial one. Builds are serialized by a mutex. A failed
//! build leaves the published index untouched.
//!
//! # Query path
//!
//! ```text
//! ensure_ready (lazy load, once) → embed query → search → chunk texts
//! ```
//!
//! [`RetrievalService::search`] reports typed errors. [`RetrievalService::answer_query`]
//! is the best-effort entry point for the question-answering handler: any
//! failure degrades to an empty passage list so the answer can still be
//! produced ungrounded.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use guide_retrieval_core::chunk::chunk_text;
use guide_retrieval_core::embedding::{embed_query, validate_embeddings, Embedder};
use guide_retrieval_core::index::{FlatL2Index, IndexMetadata, RetrievalIndex};
use guide_retrieval_core::models::RetrievedChunk;
use guide_retrieval_core::{Result, RetrievalError};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::extract_document;
use crate::store::IndexStore;

/// Summary of a completed build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub document: PathBuf,
    pub snapshot: PathBuf,
    pub words: usize,
    pub chunks: usize,
    pub dims: usize,
    pub model: String,
    pub source_sha256: String,
}

enum LoadState {
    Unloaded,
    Ready(Arc<RetrievalIndex>),
    Unavailable(SnapshotFault),
}

/// A snapshot error remembered so later queries do not reread the file.
#[derive(Debug, Clone)]
struct SnapshotFault {
    path: PathBuf,
    reason: String,
    incompatible: bool,
}

impl SnapshotFault {
    fn from_error(err: &RetrievalError) -> Option<Self> {
        match err {
            RetrievalError::CorruptSnapshot { path, reason } => Some(Self {
                path: path.clone(),
                reason: reason.clone(),
                incompatible: false,
            }),
            RetrievalError::IncompatibleSnapshot { path, reason } => Some(Self {
                path: path.clone(),
                reason: reason.clone(),
                incompatible: true,
            }),
            _ => None,
        }
    }

    fn to_error(&self) -> RetrievalError {
        let path = self.path.clone();
        let reason = self.reason.clone();
        if self.incompatible {
            RetrievalError::IncompatibleSnapshot { path, reason }
        } else {
            RetrievalError::CorruptSnapshot { path, reason }
        }
    }
}

pub struct RetrievalService {
    config: Config,
    embedder: Arc<dyn Embedder>,
    store: IndexStore,
    state: RwLock<LoadState>,
    build_lock: tokio::sync::Mutex<()>,
    load_lock: tokio::sync::Mutex<()>,
}

impl RetrievalService {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let store = IndexStore::new(config.index.path.clone());
        Self {
            config,
            embedder,
            store,
            state: RwLock::new(LoadState::Unloaded),
            build_lock: tokio::sync::Mutex::new(()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Construct a service with the embedder selected by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        Ok(Self::new(config.clone(), embedder))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Default number of passages per query.
    pub fn top_k(&self) -> usize {
        self.config.retrieval.top_k
    }

    /// Whether an index is published in memory.
    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    /// The currently published index, if any.
    pub fn current(&self) -> Option<Arc<RetrievalIndex>> {
        match &*self.read_state() {
            LoadState::Ready(index) => Some(Arc::clone(index)),
            _ => None,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LoadState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LoadState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Publish a freshly built index, replacing whatever was there.
    fn publish(&self, index: Arc<RetrievalIndex>) {
        *self.write_state() = LoadState::Ready(index);
    }

    /// Publish a loaded snapshot unless a build published a newer index
    /// while the file was being read. Returns whether it was published.
    fn publish_loaded(&self, index: Arc<RetrievalIndex>) -> bool {
        let mut state = self.write_state();
        if matches!(*state, LoadState::Ready(_)) {
            return false;
        }
        *state = LoadState::Ready(index);
        true
    }

    /// Remember a snapshot fault so later queries fail without rereading.
    fn remember_fault(&self, err: RetrievalError) -> RetrievalError {
        if let Some(fault) = SnapshotFault::from_error(&err) {
            let mut state = self.write_state();
            if matches!(*state, LoadState::Unloaded) {
                *state = LoadState::Unavailable(fault);
            }
        }
        err
    }

    /// `None` while nothing has been loaded or remembered yet.
    fn settled(&self) -> Option<Result<bool>> {
        match &*self.read_state() {
            LoadState::Unloaded => None,
            LoadState::Ready(_) => Some(Ok(true)),
            LoadState::Unavailable(fault) => Some(Err(fault.to_error())),
        }
    }

    fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.config.embedding.timeout_secs)
    }

    /// Build a new index from `document`, persist it, and publish it.
    ///
    /// # Errors
    ///
    /// `DocumentRead`, `Embedding`/`EmbeddingTimeout`, or `Persistence`. On
    /// error the previously published index (if any) stays in place.
    pub async fn build_index(&self, document: &Path) -> Result<BuildReport> {
        let _build = self.build_lock.lock().await;

        tracing::info!(document = %document.display(), "building index");
        let doc_path = document.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_document(&doc_path))
            .await
            .map_err(|e| RetrievalError::DocumentRead {
                path: document.to_path_buf(),
                reason: format!("extraction task failed: {}", e),
            })??;

        let source_sha256 = format!("{:x}", Sha256::digest(text.as_bytes()));
        let words = text.split_whitespace().count();
        let chunks: Vec<String> = chunk_text(&text, self.config.chunking.words_per_chunk)?
            .into_iter()
            .map(|c| c.text)
            .collect();
        tracing::info!(words, chunks = chunks.len(), "document chunked");

        let vectors = self.embed_chunks(&chunks).await?;
        let dims = self.embedder.dims();
        let index = RetrievalIndex::new(
            IndexMetadata {
                model: self.embedder.model_name().to_string(),
                source_sha256: source_sha256.clone(),
                built_at: chrono::Utc::now().to_rfc3339(),
            },
            chunks,
            FlatL2Index::build(dims, &vectors)?,
        )?;
        let index = Arc::new(index);

        let store = self.store.clone();
        let to_save = Arc::clone(&index);
        tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .map_err(|e| RetrievalError::Persistence {
                path: self.store.path().to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            })??;

        let report = BuildReport {
            document: document.to_path_buf(),
            snapshot: self.store.path().to_path_buf(),
            words,
            chunks: index.len(),
            dims,
            model: self.embedder.model_name().to_string(),
            source_sha256,
        };
        self.publish(index);
        tracing::info!(
            chunks = report.chunks,
            dims = report.dims,
            snapshot = %report.snapshot.display(),
            "index built and published"
        );
        Ok(report)
    }

    /// Embed chunk texts in batches, each bounded by the embedding timeout.
    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        let batch_size = self.config.embedding.batch_size.max(1);
        let timeout = self.embed_timeout();

        for (n, batch) in chunks.chunks(batch_size).enumerate() {
            let batch_vectors = tokio::time::timeout(timeout, self.embedder.embed(batch))
                .await
                .map_err(|_| RetrievalError::EmbeddingTimeout(timeout))??;
            validate_embeddings(batch.len(), self.embedder.dims(), &batch_vectors)?;
            tracing::debug!(batch = n, size = batch.len(), "embedded batch");
            vectors.extend(batch_vectors);
        }

        Ok(vectors)
    }

    /// Make sure an index is published, loading the snapshot on first use.
    ///
    /// Returns `Ok(false)` when no snapshot exists yet. Concurrent callers
    /// wait for one load instead of loading twice. A snapshot written by
    /// another embedding model or format version is rebuilt from
    /// `[index] document` when configured; otherwise the failure is
    /// remembered until the next successful build.
    pub async fn ensure_ready(&self) -> Result<bool> {
        if let Some(settled) = self.settled() {
            return settled;
        }

        let _load = self.load_lock.lock().await;
        if let Some(settled) = self.settled() {
            return settled;
        }

        let store = self.store.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| RetrievalError::Persistence {
                path: self.store.path().to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            })?;

        let index = match loaded {
            Ok(Some(index)) => index,
            Ok(None) => {
                tracing::debug!(path = %self.store.path().display(), "no index snapshot yet");
                return Ok(false);
            }
            Err(e) if e.requires_rebuild() => return self.rebuild_stale(e).await,
            Err(e) => {
                tracing::warn!(error = %e, "index snapshot could not be loaded");
                return Err(self.remember_fault(e));
            }
        };

        if let Err(e) = self.check_compatible(&index) {
            return self.rebuild_stale(e).await;
        }

        let (chunks, dims) = (index.len(), index.dims());
        if self.publish_loaded(Arc::new(index)) {
            tracing::info!(
                path = %self.store.path().display(),
                chunks,
                dims,
                "index snapshot loaded"
            );
        } else {
            tracing::debug!("a build published a newer index during load; snapshot discarded");
        }
        Ok(true)
    }

    /// A snapshot is usable only with the embedder that produced it.
    fn check_compatible(&self, index: &RetrievalIndex) -> Result<()> {
        let model = &index.metadata().model;
        if model != self.embedder.model_name() || index.dims() != self.embedder.dims() {
            return Err(RetrievalError::IncompatibleSnapshot {
                path: self.store.path().to_path_buf(),
                reason: format!(
                    "built with {} ({} dims), active embedder is {} ({} dims)",
                    model,
                    index.dims(),
                    self.embedder.model_name(),
                    self.embedder.dims()
                ),
            });
        }
        Ok(())
    }

    async fn rebuild_stale(&self, reason: RetrievalError) -> Result<bool> {
        match self.config.index.document.clone() {
            Some(document) => {
                tracing::warn!(error = %reason, "index snapshot is stale; rebuilding");
                self.build_index(&document).await?;
                Ok(true)
            }
            None => {
                tracing::warn!(
                    error = %reason,
                    "index snapshot is stale and no [index] document is configured"
                );
                Err(self.remember_fault(reason))
            }
        }
    }

    /// Return the `k` passages nearest to `query`, nearest first.
    ///
    /// An empty list means no index has been built for this deployment.
    ///
    /// # Errors
    ///
    /// - `IndexNotReady` when the published index holds zero chunks.
    /// - `Embedding`/`EmbeddingTimeout` when the query cannot be embedded.
    /// - `Persistence`/`CorruptSnapshot`/`IncompatibleSnapshot` from a failed load.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if !self.ensure_ready().await? {
            return Ok(Vec::new());
        }
        let index = self.current().ok_or(RetrievalError::IndexNotReady)?;
        if index.is_empty() {
            return Err(RetrievalError::IndexNotReady);
        }

        let timeout = self.embed_timeout();
        let query_vec = tokio::time::timeout(timeout, embed_query(self.embedder.as_ref(), query))
            .await
            .map_err(|_| RetrievalError::EmbeddingTimeout(timeout))??;

        index.search(&query_vec, k)
    }

    /// Best-effort retrieval for the question-answering handler.
    ///
    /// Never fails: every retrieval error is logged and degrades to an empty
    /// list, leaving the caller to answer without grounding.
    pub async fn answer_query(&self, query: &str, k: usize) -> Vec<String> {
        match self.search(query, k).await {
            Ok(hits) => hits.into_iter().map(|h| h.text).collect(),
            Err(RetrievalError::IndexNotReady) => {
                tracing::debug!("index holds no passages; answering without grounding");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "retrieval failed; answering without grounding"
                );
                Vec::new()
            }
        }
    }

    /// Grounding context for a language-model prompt.
    ///
    /// Retrieved passages are joined by blank lines; when nothing is
    /// retrieved the configured fallback sentence is returned instead.
    pub async fn grounding_context(&self, query: &str, k: usize) -> String {
        let passages = self.answer_query(query, k).await;
        format_context(&passages, &self.config.retrieval.fallback_context)
    }
}

/// Join passages with blank lines, or return `fallback` if there are none.
pub fn format_context(passages: &[String], fallback: &str) -> String {
    if passages.is_empty() {
        fallback.to_string()
    } else {
        passages.join("\n\n")
    }
}
