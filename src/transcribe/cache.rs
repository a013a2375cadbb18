use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::Result;

/// Holds a model that is loaded at most once per process.
///
/// Concurrent first callers wait on the same load. A failed load leaves the
/// cache empty, so the next caller tries again.
pub struct ModelCache<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Default for ModelCache<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T> ModelCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Cached model, running `load` only if nothing is cached yet
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await
            .cloned()
    }
}
