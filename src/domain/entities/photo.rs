//! Stock photo entity and search page results.

use serde::{Deserialize, Serialize};

/// A single stock photo as returned by a provider.
///
/// `full_image_url` identifies the photo for download deduplication and
/// cancellation; the remaining fields are display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Photo {
    /// Preview image URL, if the provider supplies one.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Full-resolution image URL.
    pub full_image_url: String,
    /// Accessibility text describing the photo.
    #[serde(default)]
    pub alt_text: Option<String>,
}

impl Photo {
    /// Creates a photo with only a full-resolution URL.
    #[must_use]
    pub fn new(full_image_url: impl Into<String>) -> Self {
        Self {
            thumbnail_url: None,
            full_image_url: full_image_url.into(),
            alt_text: None,
        }
    }

    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_alt_text(mut self, text: impl Into<String>) -> Self {
        self.alt_text = Some(text.into());
        self
    }

    /// Returns the last path segment of the full image URL without its
    /// extension or query string.
    #[must_use]
    pub fn file_stem(&self) -> Option<&str> {
        let path = self.full_image_url.split(['?', '#']).next()?;
        let segment = path.rsplit('/').next()?;
        let stem = segment.split('.').next()?;
        (!stem.is_empty()).then_some(stem)
    }
}

/// One page of results from a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Photos in the order the provider returned them.
    pub photos: Vec<Photo>,
    /// Token for the next page. `None` means the provider has no more pages.
    pub continuation_token: Option<String>,
}

impl SearchResult {
    #[must_use]
    pub fn new(photos: Vec<Photo>, continuation_token: Option<String>) -> Self {
        Self {
            photos,
            continuation_token,
        }
    }

    /// Returns true if another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.continuation_token.is_some()
    }
}
