//! Work deferred until a buffer finishes loading, keyed by resolved path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Resolve `path` to the key used for deferral. Falls back to an absolute,
/// non-canonical form when the file does not exist yet.
pub fn resolve_key(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// At most one continuation per path; the newest request replaces an older one.
pub struct PendingQueue<T> {
    inner: Mutex<HashMap<PathBuf, T>>,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `work` for `path`, returning the continuation it replaced.
    pub fn defer(&self, path: &Path, work: T) -> Option<T> {
        let key = resolve_key(path);
        tracing::debug!(path = %key.display(), "deferred until load");
        self.lock().insert(key, work)
    }

    /// Remove and return the continuation for `path`. Removal happens under the
    /// lock, so a second load event for the same path gets nothing.
    pub fn take(&self, path: &Path) -> Option<T> {
        self.lock().remove(&resolve_key(path))
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.lock().contains_key(&resolve_key(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, T>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
