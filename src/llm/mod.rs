//! Model backend access.
//!
//! An OpenAI-compatible HTTP client plus an optional seeded response cache.

pub mod cache;
pub mod client;

pub use cache::{CachedBackend, ResponseCache, DEFAULT_CACHE_ROOT};
pub use client::{ChatBackend, ChatCompletion, ChatMessage, ChatRequest, OpenAiClient, Usage};

use crate::config::LlmConfig;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build the backend described by `config`, wrapping it in a cache when a
/// seed is set.
pub fn backend_from_config(config: &LlmConfig, cache_root: &Path) -> Result<Arc<dyn ChatBackend>> {
    let client = OpenAiClient::new(config)?;

    match config.cache_seed {
        Some(seed) => {
            info!("Response cache enabled (seed {})", seed);
            let cache = ResponseCache::open(cache_root, seed)?;
            Ok(Arc::new(CachedBackend::new(client, cache)))
        }
        None => Ok(Arc::new(client)),
    }
}
