//! Fixed-size word-window chunker.
//!
//! Splits extracted document text into [`Chunk`]s of exactly
//! `words_per_chunk` whitespace-delimited words. Windows do not overlap,
//! so the chunk sequence is a total, order-preserving partition of the
//! document's words.
//!
//! # Algorithm
//!
//! 1. Split the text on any run of Unicode whitespace.
//! 2. Walk the word list in steps of `words_per_chunk`.
//! 3. Join each window's words with a single space.
//! 4. The final window holds the remainder (`1..=words_per_chunk` words).
//!
//! Empty or whitespace-only text yields no chunks. Because windows are built
//! from non-empty words, no chunk is ever empty or whitespace-only.
//!
//! # Example
//!
//! ```rust
//! use guide_retrieval_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("A B C D E F", 2).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["A B", "C D", "E F"]);
//! ```

use crate::error::{Result, RetrievalError};
use crate::models::Chunk;

/// Default number of words per chunk.
pub const DEFAULT_WORDS_PER_CHUNK: usize = 500;

/// Split text into consecutive windows of `words_per_chunk` words.
///
/// Returns chunks with contiguous indices starting at 0.
///
/// # Errors
///
/// [`RetrievalError::InvalidChunkSize`] when `words_per_chunk` is zero.
pub fn chunk_text(text: &str, words_per_chunk: usize) -> Result<Vec<Chunk>> {
    if words_per_chunk == 0 {
        return Err(RetrievalError::InvalidChunkSize);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let chunks = words
        .chunks(words_per_chunk)
        .enumerate()
        .map(|(index, window)| Chunk {
            index,
            text: window.join(" "),
        })
        .collect();

    Ok(chunks)
}

/// Number of chunks [`chunk_text`] produces for `word_count` words.
pub fn expected_chunk_count(word_count: usize, words_per_chunk: usize) -> usize {
    if words_per_chunk == 0 {
        return 0;
    }
    word_count.div_ceil(words_per_chunk)
}
