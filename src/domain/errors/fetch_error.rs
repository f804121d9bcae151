//! Resource fetch and attachment download error types.

use thiserror::Error;

/// Result type for resource fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Errors that can occur while fetching a remote resource.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("HTTP {0}")]
    Http(u16),
    /// Local I/O failure while buffering the payload.
    #[error("IO error: {0}")]
    Io(String),
    /// Payload could not be decoded as an image.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The fetch was abandoned on purpose.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Terminal failure of an attachment download.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// The payload could not be fetched.
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    /// Superseded by another download. Not a user-facing failure.
    #[error("download cancelled")]
    Cancelled,
    /// Nothing was received, so no file type could be determined.
    #[error("downloaded payload is empty")]
    EmptyPayload,
    /// Reading or relocating the payload failed.
    #[error("failed to store attachment: {0}")]
    Io(String),
}

impl DownloadError {
    /// Returns whether callers should ignore this outcome.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Fetch(FetchError::Cancelled))
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_variants() {
        assert!(DownloadError::Cancelled.is_cancelled());
        assert!(DownloadError::from(FetchError::Cancelled).is_cancelled());
        assert!(!DownloadError::EmptyPayload.is_cancelled());
        assert!(!DownloadError::from(FetchError::Http(404)).is_cancelled());
    }

    #[test]
    fn test_io_conversion() {
        let err: DownloadError = std::io::Error::other("disk full").into();
        assert_eq!(err.to_string(), "failed to store attachment: disk full");
    }
}
