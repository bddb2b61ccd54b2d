//! TOML configuration parsing and validation.
//!
//! One configuration file describes one retrieval deployment: where its
//! index snapshot lives, how documents are chunked, how many passages a
//! query returns, and which embedding provider produces vectors.
//!
//! ```toml
//! [index]
//! path = "./data/guide_index.json"
//! document = "./data/guide.pdf"
//!
//! [chunking]
//! words_per_chunk = 500
//!
//! [retrieval]
//! top_k = 3
//!
//! [embedding]
//! provider = "local"
//! model = "paraphrase-multilingual-minilm-l12-v2"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use guide_retrieval_core::chunk::DEFAULT_WORDS_PER_CHUNK;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Fixed snapshot location for this deployment.
    pub path: PathBuf,
    /// Reference document; used by `guide build` without an argument and
    /// to rebuild a stale snapshot on first load.
    #[serde(default)]
    pub document: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_words_per_chunk")]
    pub words_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            words_per_chunk: default_words_per_chunk(),
        }
    }
}

fn default_words_per_chunk() -> usize {
    DEFAULT_WORDS_PER_CHUNK
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_fallback_context")]
    pub fallback_context: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            fallback_context: default_fallback_context(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_fallback_context() -> String {
    "No relevant information was found in the guide.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// A configuration with defaults everywhere except the snapshot path.
    pub fn with_index_path(path: impl Into<PathBuf>) -> Self {
        Self {
            index: IndexConfig {
                path: path.into(),
                document: None,
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Check value ranges and provider requirements.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.words_per_chunk == 0 {
            anyhow::bail!("chunking.words_per_chunk must be >= 1");
        }

        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be >= 1");
        }

        if self.embedding.timeout_secs == 0 {
            anyhow::bail!("embedding.timeout_secs must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "local" => {}
            "openai" | "ollama" => {
                if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                    anyhow::bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    );
                }
                if self.embedding.model.is_none() {
                    anyhow::bail!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    );
                }
            }
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }

        Ok(())
    }
}

/// Parse a TOML configuration string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
