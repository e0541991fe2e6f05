//! Seeded on-disk response cache.
//!
//! Completions are stored in `<root>/<seed>/cache.db`, keyed by the
//! serialized request. Identical requests under the same seed are answered
//! without contacting the backend.

use super::client::{ChatBackend, ChatCompletion, ChatRequest, LlmError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Default directory holding one subdirectory per seed.
pub const DEFAULT_CACHE_ROOT: &str = ".cache";

pub struct ResponseCache {
    conn: Mutex<Connection>,
}

impl ResponseCache {
    /// Open the cache for `seed` under `root`, creating it if needed.
    pub fn open(root: &Path, seed: u64) -> Result<Self> {
        let dir = root.join(seed.to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        let path = dir.join("cache.db");
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open response cache at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// A throwaway cache, for tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS responses (
                request TEXT PRIMARY KEY,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, request: &ChatRequest) -> Result<Option<ChatCompletion>, LlmError> {
        let key = serde_json::to_string(request)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let stored: Option<String> = conn
            .query_row(
                "SELECT response FROM responses WHERE request = ?1",
                [&key],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(json) => {
                let mut completion: ChatCompletion = serde_json::from_str(&json)?;
                completion.cached = true;
                Ok(Some(completion))
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, request: &ChatRequest, completion: &ChatCompletion) -> Result<(), LlmError> {
        let key = serde_json::to_string(request)?;
        let value = serde_json::to_string(completion)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR REPLACE INTO responses (request, response, created_at)
             VALUES (?1, ?2, ?3)",
            (&key, &value, chrono::Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}

/// A backend that consults a [`ResponseCache`] before the wrapped backend.
pub struct CachedBackend<B> {
    inner: B,
    cache: ResponseCache,
}

impl<B: ChatBackend> CachedBackend<B> {
    pub fn new(inner: B, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<B: ChatBackend> ChatBackend for CachedBackend<B> {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        if let Some(hit) = self.cache.get(request)? {
            debug!("Response cache hit");
            return Ok(hit);
        }

        let completion = self.inner.complete(request).await?;
        self.cache.put(request, &completion)?;
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{ChatMessage, Usage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatCompletion {
                id: Some(format!("resp-{}", n)),
                content: format!("echo: {}", request.messages.len()),
                usage: Usage::default(),
                cached: false,
            })
        }
    }

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user(text)],
            temperature: 0.0,
            stream: false,
        }
    }

    #[tokio::test]
    async fn test_cached_backend_reuses_responses() {
        let backend = CachedBackend::new(
            CountingBackend {
                calls: AtomicUsize::new(0),
            },
            ResponseCache::in_memory().unwrap(),
        );

        let first = backend.complete(&request("diff")).await.unwrap();
        let second = backend.complete(&request("diff")).await.unwrap();
        let other = backend.complete(&request("other diff")).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.content, second.content);
        assert_eq!(first.id, second.id);
        assert!(!other.cached);
        assert_eq!(backend.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_persists_per_seed() {
        let dir = tempfile::TempDir::new().unwrap();
        let completion = ChatCompletion {
            id: None,
            content: "cached answer".to_string(),
            usage: Usage::default(),
            cached: false,
        };

        {
            let cache = ResponseCache::open(dir.path(), 42).unwrap();
            cache.put(&request("x"), &completion).unwrap();
        }

        let reopened = ResponseCache::open(dir.path(), 42).unwrap();
        let hit = reopened.get(&request("x")).unwrap().unwrap();
        assert_eq!(hit.content, "cached answer");

        let other_seed = ResponseCache::open(dir.path(), 7).unwrap();
        assert!(other_seed.get(&request("x")).unwrap().is_none());
        assert!(dir.path().join("42").join("cache.db").exists());
    }
}
