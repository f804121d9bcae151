//! HTTP implementation of the resource fetcher port.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::{ProgressFn, ResourceFetcher};

const USER_AGENT: &str = concat!("stock-search/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches thumbnails and attachments over HTTP with a shared client.
#[derive(Debug, Clone)]
pub struct HttpResourceFetcher {
    client: reqwest::Client,
}

impl HttpResourceFetcher {
    /// Creates a fetcher with its own client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout_secs: u64) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying client, for sharing with search providers.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get(&self, url: &str) -> FetchResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        debug!(url, "Fetching resource");
        self.get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body: {e}")))
    }

    async fn download(&self, url: &str, progress: &ProgressFn) -> FetchResult<TempPath> {
        debug!(url, "Downloading attachment");
        let mut response = self.get(url).await?;
        let total = response.content_length();

        let path = tempfile::NamedTempFile::new()
            .map_err(|e| FetchError::Io(format!("Failed to create temp file: {e}")))?
            .into_temp_path();
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| FetchError::Io(format!("Failed to open temp file: {e}")))?;

        let mut received = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Io(format!("Failed to write temp file: {e}")))?;
            received += chunk.len() as u64;
            progress(received, total);
        }

        file.flush()
            .await
            .map_err(|e| FetchError::Io(format!("Failed to flush temp file: {e}")))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        assert!(HttpResourceFetcher::new(DEFAULT_TIMEOUT_SECS).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() -> Result<(), Box<dyn std::error::Error>> {
        let fetcher = HttpResourceFetcher::new(2)?;
        let result = fetcher.fetch("http://127.0.0.1:1/thumb.jpg").await;
        assert!(matches!(result, Err(FetchError::Network(_))));
        Ok(())
    }
}
