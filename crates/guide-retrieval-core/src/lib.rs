//! # Guide Retrieval Core
//!
//! Pure retrieval logic shared by the guide retrieval service: data models,
//! the error taxonomy, word-window chunking, the embedder trait, and the
//! exhaustive L2 vector index.
//!
//! This crate performs no filesystem or network I/O. Text extraction,
//! concrete embedding providers, and snapshot persistence live in the
//! `guide-retrieval` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;

pub use error::{Result, RetrievalError};
