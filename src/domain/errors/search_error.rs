//! Provider search and registry error types.

use thiserror::Error;

/// Errors returned by a search backend for a single page request.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum SearchError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("provider responded with HTTP {status}")]
    Http { status: u16 },

    #[error("failed to decode provider response: {message}")]
    Decode { message: String },

    #[error("could not build provider request: {message}")]
    InvalidRequest { message: String },

    #[error("provider returned no data")]
    NoData,

    #[error("search was cancelled")]
    Cancelled,
}

impl SearchError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns whether the error only reflects an intentional cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from mutating the provider registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("cannot disable {0}: at least one provider must stay enabled")]
    LastProvider(String),
}
