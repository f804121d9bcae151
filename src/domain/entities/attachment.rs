//! Downloaded full-resolution attachments.

use std::path::{Path, PathBuf};

/// Image container detected from a payload's leading byte.
///
/// Consumers of attachment files infer the type from the extension and
/// ignore any HTTP content type, so the extension must match the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Gif,
    Tiff,
    Png,
}

impl ImageKind {
    /// Detects the kind from the first byte of a payload.
    /// Unknown leading bytes fall back to PNG; an empty payload yields `None`.
    #[must_use]
    pub fn sniff(payload: &[u8]) -> Option<Self> {
        let first = *payload.first()?;
        Some(match first {
            0xFF => Self::Jpeg,
            0x47 => Self::Gif,
            0x49 | 0x4D => Self::Tiff,
            _ => Self::Png,
        })
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Png => "png",
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A downloaded file owned by the caller.
///
/// The caller removes it with [`Attachment::clean_up`] once it has been
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: PathBuf,
    kind: ImageKind,
}

impl Attachment {
    #[must_use]
    pub const fn new(path: PathBuf, kind: ImageKind) -> Self {
        Self { path, kind }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Removes the file from disk. Failures are logged and ignored.
    pub async fn clean_up(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::debug!(path = %self.path.display(), error = %e, "Attachment cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[0xFF, 0xD8, 0xFF], Some(ImageKind::Jpeg) ; "jpeg")]
    #[test_case(b"GIF89a", Some(ImageKind::Gif) ; "gif")]
    #[test_case(&[0x49, 0x49, 0x2A, 0x00], Some(ImageKind::Tiff) ; "tiff_little_endian")]
    #[test_case(&[0x4D, 0x4D, 0x00, 0x2A], Some(ImageKind::Tiff) ; "tiff_big_endian")]
    #[test_case(&[0x89, 0x50, 0x4E, 0x47], Some(ImageKind::Png) ; "png")]
    #[test_case(b"RIFF", Some(ImageKind::Png) ; "unknown_defaults_to_png")]
    #[test_case(&[], None ; "empty")]
    fn test_sniff(payload: &[u8], expected: Option<ImageKind>) {
        assert_eq!(ImageKind::sniff(payload), expected);
    }

    #[tokio::test]
    async fn test_clean_up_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        tokio::fs::write(&path, b"x").await.unwrap();

        let attachment = Attachment::new(path.clone(), ImageKind::Png);
        attachment.clean_up().await;
        assert!(!path.exists());

        attachment.clean_up().await;
    }
}
