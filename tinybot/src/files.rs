//! # File Links
//!
//! Downloading a file takes a `getFile` call to turn a file identifier into a temporary link.
//! Links are cached per identifier for [`ApiConfig::file_link_ttl`].
//!
//! [`ApiConfig::file_link_ttl`]: crate::config::ApiConfig::file_link_ttl
//!
//! The cache is best-effort: expired entries are pruned on every access, and two concurrent
//! lookups of the same cold identifier both reach the remote service. Losing that race only
//! costs an extra `getFile` call.
use crate::{
    api::{Api, RequestError},
    transport::{Transport, TransportError, http::HttpTransport},
    view::ViewError,
};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to resolve the file: {0}")]
    Request(#[from] RequestError),
    #[error("Unexpected getFile result: {0}")]
    View(#[from] ViewError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
struct CachedLink {
    link: String,
    expires_at: Instant,
}

/// A time bounded cache of file links, keyed by file identifier.
#[derive(Debug, Default)]
pub struct FileLinkCache {
    entries: Mutex<HashMap<String, CachedLink>>,
}

impl FileLinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached link for `key`, or awaits `fetch` and caches its result for `ttl`.
    ///
    /// The lock is never held while `fetch` runs. A failed fetch caches nothing.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        ttl: Duration,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        {
            let mut entries = self.lock();
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);

            if let Some(entry) = entries.get(key) {
                tracing::debug!(key, "file link cache hit");
                return Ok(entry.link.clone());
            }
        }

        tracing::debug!(key, "file link cache miss");
        let link = fetch().await?;

        self.lock().insert(
            key.to_string(),
            CachedLink {
                link: link.clone(),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(link)
    }

    /// Number of entries, including expired ones not pruned yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedLink>> {
        // Entries are plain data, a panic while holding the lock cannot leave them half written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Api<T> {
    /// Resolves the download link of a file, calling `getFile` only on a cache miss.
    pub async fn file_link(&self, file_id: &str) -> Result<String, FileError> {
        let fetch = || async {
            let file = self
                .method("getFile")
                .invoke(serde_json::json!({ "file_id": file_id }))
                .await?;
            let file_path = file.get("file_path")?;
            Ok::<_, FileError>(self.config.file_link(file_path.as_str()?))
        };

        self.file_links
            .get_or_fetch(file_id, fetch, self.config.file_link_ttl())
            .await
    }
}

impl Api<HttpTransport> {
    /// Downloads the content of a file.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, FileError> {
        let link = self.file_link(file_id).await?;
        Ok(self.transport.fetch_bytes(&link).await?)
    }
}
