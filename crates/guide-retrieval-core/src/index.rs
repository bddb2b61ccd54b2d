//! Exhaustive L2 vector index and the chunk/vector pair it serves.
//!
//! [`FlatL2Index`] stores equal-dimension vectors in one row-major buffer
//! and answers k-nearest-neighbor queries by scanning every vector. At
//! reference-document scale (hundreds of chunks) this is exact and fast
//! enough; there is no approximate structure to tune or rebuild.
//!
//! [`RetrievalIndex`] holds the chunk texts together with their vectors as
//! one immutable unit. Vector `i` always belongs to chunk `i`.
//!
//! # Ordering
//!
//! Hits are ordered by ascending distance; equal distances are ordered by
//! ascending position so results are deterministic.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::embedding::l2_squared;
use crate::error::{Result, RetrievalError};
use crate::models::{RetrievedChunk, SearchHit};

/// Flat (brute-force) Euclidean nearest-neighbor index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dims: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// An empty index for vectors of `dims` dimensions.
    pub fn empty(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    /// Build an index over `vectors`, all of which must have `dims` entries.
    ///
    /// Each call produces a fresh index; nothing carries over from a
    /// previous build.
    pub fn build(dims: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut data = Vec::with_capacity(dims * vectors.len());
        for v in vectors {
            if v.len() != dims {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dims,
                    actual: v.len(),
                });
            }
            data.extend_from_slice(v);
        }
        Ok(Self { dims, data })
    }

    /// Rebuild an index from a row-major buffer, as produced by [`Self::as_flat`].
    pub fn from_flat(dims: usize, data: Vec<f32>) -> Result<Self> {
        let misaligned = if dims == 0 {
            !data.is_empty()
        } else {
            data.len() % dims != 0
        };
        if misaligned {
            return Err(RetrievalError::DimensionMismatch {
                expected: dims,
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dims;
        self.data.get(start..start + self.dims)
    }

    /// All vectors as one row-major buffer.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Return the `k` nearest vectors to `query`, nearest first.
    ///
    /// `k` is clamped to the number of stored vectors.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::IndexNotReady`] when the index holds no vectors.
    /// - [`RetrievalError::DimensionMismatch`] when `query` has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(RetrievalError::IndexNotReady);
        }
        if query.len() != self.dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(position, v)| (l2_squared(query, v), position))
            .collect();

        scored.sort_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        scored.truncate(k.min(scored.len()));

        Ok(scored
            .into_iter()
            .map(|(sq, position)| SearchHit {
                position,
                distance: sq.sqrt(),
            })
            .collect())
    }
}

/// Provenance recorded alongside an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Embedding model that produced the vectors.
    pub model: String,
    /// SHA-256 of the extracted document text the index was built from.
    pub source_sha256: String,
    /// RFC 3339 build timestamp.
    pub built_at: String,
}

/// The chunk sequence of one document together with its vectors.
///
/// Immutable once built. A rebuild produces a new value that replaces this
/// one wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalIndex {
    metadata: IndexMetadata,
    chunks: Vec<String>,
    vectors: FlatL2Index,
}

impl RetrievalIndex {
    /// Pair `chunks` with `vectors`, enforcing one vector per chunk.
    pub fn new(metadata: IndexMetadata, chunks: Vec<String>, vectors: FlatL2Index) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RetrievalError::ChunkCountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        Ok(Self {
            metadata,
            chunks,
            vectors,
        })
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn vectors(&self) -> &FlatL2Index {
        &self.vectors
    }

    pub fn dims(&self) -> usize {
        self.vectors.dims()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return the chunks nearest to `query_vec`, nearest first.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let hits = self.vectors.search(query_vec, k)?;
        hits.into_iter()
            .map(|hit| {
                let text = self.chunks.get(hit.position).cloned().ok_or_else(|| {
                    RetrievalError::ChunkCountMismatch {
                        chunks: self.chunks.len(),
                        vectors: self.vectors.len(),
                    }
                })?;
                Ok(RetrievedChunk {
                    index: hit.position,
                    distance: hit.distance,
                    text,
                })
            })
            .collect()
    }
}
