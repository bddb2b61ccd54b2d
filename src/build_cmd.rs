use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::service::RetrievalService;

/// Build the index from `document`, or from `[index] document` when omitted.
pub async fn run_build(config: &Config, document: Option<PathBuf>) -> Result<()> {
    let document = match document.or_else(|| config.index.document.clone()) {
        Some(d) => d,
        None => bail!("No document given. Pass a path or set [index] document in config."),
    };

    let service = RetrievalService::from_config(config)?;
    let report = service.build_index(&document).await?;

    println!("build");
    println!("  document: {}", report.document.display());
    println!("  words: {}", report.words);
    println!("  chunks: {}", report.chunks);
    println!("  model: {} ({} dims)", report.model, report.dims);
    println!("  snapshot: {}", report.snapshot.display());
    Ok(())
}

/// Print snapshot metadata.
pub fn run_stats(config: &Config) -> Result<()> {
    let store = crate::store::IndexStore::new(config.index.path.clone());
    match store.stats()? {
        None => {
            println!("No index snapshot at {}.", store.path().display());
            println!("Run `guide build <document>` to create one.");
        }
        Some(stats) => {
            println!("index");
            println!("  path: {}", stats.path.display());
            println!("  format version: {}", stats.format_version);
            println!("  model: {} ({} dims)", stats.model, stats.dims);
            println!("  chunks: {}", stats.chunk_count);
            println!("  source sha256: {}", stats.source_sha256);
            println!("  built at: {}", stats.built_at);
            println!("  size: {} bytes", stats.size_bytes);
        }
    }
    Ok(())
}
