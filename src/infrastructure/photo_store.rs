//! Persistent, optionally bounded photo lists (favourites, recents).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::entities::Photo;

/// Most recent photos kept in the recents list.
pub const RECENTS_LIMIT: usize = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered set of photos persisted as JSON after every change.
///
/// Adding past the limit drops the oldest photos first. Adding a photo that
/// is already present leaves it where it is. Subscribers see every change
/// through a watch channel.
pub struct PhotoStore {
    name: String,
    path: Option<PathBuf>,
    limit: Option<usize>,
    photos: watch::Sender<Vec<Photo>>,
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("limit", &self.limit)
            .field("len", &self.len())
            .finish()
    }
}

impl PhotoStore {
    /// Opens `<dir>/<name>.json`, starting empty if the file is missing or
    /// unreadable.
    #[must_use]
    pub fn open(dir: &Path, name: &str, limit: Option<usize>) -> Self {
        let path = dir.join(format!("{}.json", name.to_lowercase()));
        let photos = match Self::load(&path) {
            Ok(photos) => photos,
            Err(e) => {
                warn!(store = name, error = %e, "Failed to load photo store, starting empty");
                Vec::new()
            }
        };
        Self::with_photos(name, Some(path), limit, photos)
    }

    /// A store that is never written to disk.
    #[must_use]
    pub fn in_memory(name: &str, limit: Option<usize>) -> Self {
        Self::with_photos(name, None, limit, Vec::new())
    }

    /// The unbounded favourites list.
    #[must_use]
    pub fn favourites(dir: &Path) -> Self {
        Self::open(dir, "Favourites", None)
    }

    /// The recently sent photos, newest last.
    #[must_use]
    pub fn recents(dir: &Path) -> Self {
        Self::open(dir, "Recents", Some(RECENTS_LIMIT))
    }

    fn with_photos(name: &str, path: Option<PathBuf>, limit: Option<usize>, photos: Vec<Photo>) -> Self {
        let (photos, _) = watch::channel(photos);
        Self {
            name: name.to_string(),
            path,
            limit,
            photos,
        }
    }

    /// Reads a persisted list. A missing file is an empty list; duplicate
    /// entries are collapsed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Vec<Photo>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let mut photos: Vec<Photo> = Vec::new();
        for photo in serde_json::from_str::<Vec<Photo>>(&content)? {
            if !photos.contains(&photo) {
                photos.push(photo);
            }
        }
        Ok(photos)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Snapshot of the photos, oldest first.
    #[must_use]
    pub fn photos(&self) -> Vec<Photo> {
        self.photos.borrow().clone()
    }

    #[must_use]
    pub fn contains(&self, photo: &Photo) -> bool {
        self.photos.borrow().contains(photo)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.photos.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Watches the list; the receiver is marked changed after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Photo>> {
        self.photos.subscribe()
    }

    pub fn add(&self, photo: Photo) {
        let limit = self.limit;
        self.photos.send_modify(|photos| {
            if !photos.contains(&photo) {
                photos.push(photo);
            }
            if let Some(limit) = limit {
                let excess = photos.len().saturating_sub(limit);
                photos.drain(..excess);
            }
        });
        self.persist();
    }

    /// Removes `photo`, returning whether it was present.
    pub fn remove(&self, photo: &Photo) -> bool {
        let mut removed = false;
        self.photos.send_modify(|photos| {
            let before = photos.len();
            photos.retain(|p| p != photo);
            removed = photos.len() != before;
        });
        self.persist();
        removed
    }

    pub fn clear(&self) {
        self.photos.send_modify(Vec::clear);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let photos = self.photos();
        match Self::save_to_file(path, &photos) {
            Ok(()) => debug!(store = %self.name, count = photos.len(), "Saved photo store"),
            Err(e) => warn!(store = %self.name, error = %e, "Failed to save photo store"),
        }
    }

    fn save_to_file(path: &Path, photos: &[Photo]) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(photos)?;

        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        fs::create_dir_all(parent)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&content)?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}
