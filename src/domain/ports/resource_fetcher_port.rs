//! Port definition for fetching remote images.

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;

use crate::domain::errors::{FetchError, FetchResult};

/// Progress callback: bytes received so far and the expected total, if known.
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Port for loading remote resources.
/// Implementations must be thread-safe; callers cancel by dropping the future.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches the whole payload into memory.
    async fn fetch(&self, url: &str) -> FetchResult<Bytes>;

    /// Downloads the payload into a temporary file that is removed on drop
    /// unless persisted.
    async fn download(&self, url: &str, progress: &ProgressFn) -> FetchResult<TempPath> {
        let bytes = self.fetch(url).await?;
        let len = bytes.len() as u64;
        let path = tempfile::NamedTempFile::new()
            .map_err(|e| FetchError::Io(format!("Failed to create temp file: {e}")))?
            .into_temp_path();
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FetchError::Io(format!("Failed to write temp file: {e}")))?;
        progress(len, Some(len));
        Ok(path)
    }
}
