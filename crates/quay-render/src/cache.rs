//! Canonical result instances keyed by their identifying string.
//!
//! The cache is a last-writer-wins table: every caching `acquire` stores its
//! value, replacing whatever was there. It is cleared on each module reload
//! so a redeployed module never sees a former version's results.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{RenderError, RenderResult};
use crate::result::{FileDownload, Redirect, Render, StorageArea};

/// Build a minimal value from its identifying key.
pub trait FromKey: Send + Sync {
    /// Construct a fresh value whose only set field is the key.
    fn from_key(key: &str) -> Self;
}

impl FromKey for Redirect {
    fn from_key(key: &str) -> Self {
        Self::new(key)
    }
}

impl FromKey for Render {
    fn from_key(key: &str) -> Self {
        Self::new(key)
    }
}

impl FromKey for FileDownload {
    fn from_key(key: &str) -> Self {
        Self::new(PathBuf::from(key), StorageArea::Public)
    }
}

/// Concurrent cache of shared result instances.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: DashMap<String, Arc<T>>,
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: FromKey> ResultCache<T> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance for `key`.
    ///
    /// With `cache` set and no `candidate`, an existing entry is returned.
    /// Otherwise the candidate is used, or a fresh value is built from the
    /// key. With `cache` set, the chosen value is then stored under `key`,
    /// replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IllegalArgument`] if `key` is empty.
    pub fn acquire(&self, key: &str, candidate: Option<T>, cache: bool) -> RenderResult<Arc<T>> {
        if key.is_empty() {
            return Err(RenderError::IllegalArgument("result key is empty".into()));
        }

        if cache
            && candidate.is_none()
            && let Some(existing) = self.entries.get(key)
        {
            return Ok(Arc::clone(existing.value()));
        }

        let value = Arc::new(candidate.unwrap_or_else(|| T::from_key(key)));
        if cache {
            self.entries.insert(key.to_owned(), Arc::clone(&value));
        }
        Ok(value)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One cache per result kind, owned by the host and shared by reference.
#[derive(Debug, Default)]
pub struct ResultCaches {
    /// Redirects keyed by URL.
    pub redirects: ResultCache<Redirect>,
    /// Renders keyed by template id.
    pub renders: ResultCache<Render>,
    /// File downloads keyed by path.
    pub files: ResultCache<FileDownload>,
}

impl ResultCaches {
    /// Create empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every cache.
    pub fn clear(&self) {
        self.redirects.clear();
        self.renders.clear();
        self.files.clear();
    }

    /// Total entries across all caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.redirects
            .len()
            .saturating_add(self.renders.len())
            .saturating_add(self.files.len())
    }

    /// Whether every cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
