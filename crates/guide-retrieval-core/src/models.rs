//! Data types that flow through the build and query paths.

use serde::{Deserialize, Serialize};

/// A contiguous window of words from the reference document.
///
/// `index` is the chunk's position in the sequence; it matches the position
/// of its vector in the index and in the persisted chunk list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// A single nearest-neighbor match: vector position and its L2 distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

/// A retrieved passage, as returned to the question-answering handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub index: usize,
    pub distance: f32,
    pub text: String,
}
