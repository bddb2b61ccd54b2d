//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for distance computation and vector serialization.
//!
//! The same embedder (same model, same dimensionality) must be used to build
//! an index and to query it. Vectors from different models live in different
//! spaces and produce meaningless distances, so snapshots record the model
//! name and dimensionality and are checked against the active embedder.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the
//! `guide-retrieval` app crate.

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};

/// An embedding backend.
///
/// Implementations must be deterministic for a fixed model: the same text
/// always maps to the same vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"paraphrase-multilingual-minilm-l12-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// Rejects empty-after-strip queries, since their embedding carries no
/// meaning and would return arbitrary neighbors.
pub async fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RetrievalError::EmbeddingRejected(
            "query text is empty".to_string(),
        ));
    }
    let vectors = embedder.embed(&[query.to_string()]).await?;
    validate_embeddings(1, embedder.dims(), &vectors)?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| RetrievalError::EmbeddingRejected("empty embedding response".to_string()))
}

/// Check that a provider returned `expected` vectors of `dims` dimensions.
pub fn validate_embeddings(expected: usize, dims: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(RetrievalError::EmbeddingRejected(format!(
            "provider returned {} vectors for {} inputs",
            vectors.len(),
            expected
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(RetrievalError::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Squared Euclidean distance between two equal-length vectors.
///
/// Ranking by squared distance is identical to ranking by distance; the
/// square root is applied once per returned hit.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance between two equal-length vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_squared(a, b).sqrt()
}

/// Encode a float vector as little-endian f32 bytes.
///
/// # Example
///
/// ```rust
/// use guide_retrieval_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
///
/// Trailing bytes that do not form a whole `f32` are ignored; callers that
/// need strictness check `blob.len() % 4` first.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
