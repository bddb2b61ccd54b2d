//! `guide query`: print the passages retrieved for a question.
//!
//! By default the typed search path is used so the operator sees why
//! nothing was returned. `--context` prints exactly what the
//! question-answering handler would hand to the language model.

use anyhow::Result;

use crate::config::Config;
use crate::service::RetrievalService;
use crate::RetrievalError;

pub async fn run_query(
    config: &Config,
    query: &str,
    k: Option<usize>,
    context: bool,
) -> Result<()> {
    let service = RetrievalService::from_config(config)?;
    let k = k.unwrap_or(service.top_k());
    if k == 0 {
        anyhow::bail!("--k must be >= 1");
    }

    if context {
        println!("{}", service.grounding_context(query, k).await);
        return Ok(());
    }

    let hits = match service.search(query, k).await {
        Ok(hits) => hits,
        Err(RetrievalError::IndexNotReady) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. [chunk {}] distance: {:.4}",
            rank + 1,
            hit.index,
            hit.distance
        );
        println!("    {}", snippet(&hit.text, 240));
        println!();
    }
    Ok(())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn snippet(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("épicerie solidaire", 4), "épic…");
        assert_eq!(snippet("court", 10), "court");
    }
}
