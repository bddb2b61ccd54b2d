//! # Guide Retrieval
//!
//! Document retrieval backend for a question-answering assistant grounded
//! in a reference guide.
//!
//! A reference document (PDF or plain text) is split into fixed-size word
//! windows, each window is embedded, and the vectors are kept in an exact
//! L2 index persisted as a single snapshot file. At question time the query
//! is embedded and the nearest passages are returned as grounding context
//! for a language model.
//!
//! ## Architecture
//!
//! ```text
//! build:  ┌─────────┐   ┌───────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//!         │ Extract │──▶│ Chunk │──▶│ Embedder │──▶│ FlatL2Idx │──▶│ Snapshot │
//!         └─────────┘   └───────┘   └──────────┘   └───────────┘   └──────────┘
//!
//! query:  ┌──────────┐   ┌──────────────┐   ┌────────┐
//!         │ Snapshot │──▶│ Embed query  │──▶│ Search │──▶ passages
//!         │ (lazy)   │   └──────────────┘   └────────┘
//!         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! guide build ./data/guide.pdf      # extract, chunk, embed, write snapshot
//! guide query "domiciliation"       # nearest passages
//! guide stats                       # snapshot metadata
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Document text extraction |
//! | [`embedding`] | Embedding providers |
//! | [`store`] | Snapshot persistence |
//! | [`service`] | Build and query orchestration |
//! | [`build_cmd`] | `guide build` / `guide stats` |
//! | [`query_cmd`] | `guide query` |

pub mod build_cmd;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod query_cmd;
pub mod service;
pub mod store;

pub use guide_retrieval_core::chunk;
pub use guide_retrieval_core::index;
pub use guide_retrieval_core::models;
pub use guide_retrieval_core::{Result, RetrievalError};
pub use service::{BuildReport, RetrievalService};
