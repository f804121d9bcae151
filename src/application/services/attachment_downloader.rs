//! Full-resolution attachment downloads, one at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::{Attachment, ImageKind, Photo};
use crate::domain::errors::{DownloadError, FetchError};
use crate::domain::ports::ResourceFetcher;

const FALLBACK_STEM: &str = "image";

/// Progress and outcome notifications for attachment downloads.
#[derive(Debug)]
pub enum DownloadEvent {
    /// The active download changed. `None` means idle.
    CurrentlyDownloadingChanged(Option<Photo>),
    /// Bytes received so far for an active download.
    Progress {
        photo: Photo,
        received: u64,
        total: Option<u64>,
    },
    /// Sent exactly once for every started download, including superseded ones.
    Finished {
        photo: Photo,
        result: Result<Attachment, DownloadError>,
    },
}

struct Session {
    photo: Photo,
    cancel: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    next_generation: u64,
}

struct Shared {
    fetcher: Arc<dyn ResourceFetcher>,
    attachment_dir: PathBuf,
    state: Mutex<State>,
    event_tx: mpsc::UnboundedSender<DownloadEvent>,
}

/// Downloads full-resolution photos into the attachment directory.
///
/// At most one download is active. Requesting a different photo cancels the
/// active one; requesting the same photo again does nothing.
pub struct AttachmentDownloader {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AttachmentDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentDownloader")
            .field("attachment_dir", &self.shared.attachment_dir)
            .field("current", &self.currently_downloading())
            .finish_non_exhaustive()
    }
}

impl AttachmentDownloader {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        attachment_dir: impl Into<PathBuf>,
        event_tx: &mpsc::UnboundedSender<DownloadEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                attachment_dir: attachment_dir.into(),
                state: Mutex::new(State::default()),
                event_tx: event_tx.clone(),
            }),
        }
    }

    /// Starts downloading `photo`, superseding any other active download.
    ///
    /// Returns `false` without doing anything if `photo` is already being
    /// downloaded. Must be called from within a tokio runtime.
    pub fn download(&self, photo: Photo) -> bool {
        let mut state = self.shared.state.lock();
        if let Some(session) = &state.session {
            if session.photo.full_image_url == photo.full_image_url {
                debug!(url = %photo.full_image_url, "Download already in progress");
                return false;
            }
            session.cancel.cancel();
            debug!(url = %session.photo.full_image_url, "Superseded active download");
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let cancel = CancellationToken::new();
        state.session = Some(Session {
            photo: photo.clone(),
            cancel: cancel.clone(),
            generation,
        });
        self.shared.emit(DownloadEvent::CurrentlyDownloadingChanged(Some(photo.clone())));
        drop(state);

        debug!(url = %photo.full_image_url, generation, "Starting download");
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = shared.run(&photo, &cancel).await;
            let orphan = shared.finish(photo, generation, result);
            if let Some(attachment) = orphan {
                attachment.clean_up().await;
            }
        });
        true
    }

    /// Photo of the active download, if any.
    #[must_use]
    pub fn currently_downloading(&self) -> Option<Photo> {
        self.shared
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| s.photo.clone())
    }

    /// Directory finished attachments are moved into.
    #[must_use]
    pub fn attachment_dir(&self) -> &Path {
        &self.shared.attachment_dir
    }

    /// Removes a previously delivered attachment. Failures are only logged.
    pub async fn cleanup(path: impl AsRef<Path>) {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed attachment"),
            Err(e) => debug!(path = %path.display(), error = %e, "Attachment cleanup failed"),
        }
    }
}

impl Drop for AttachmentDownloader {
    fn drop(&mut self) {
        if let Some(session) = &self.shared.state.lock().session {
            session.cancel.cancel();
        }
    }
}

impl Shared {
    fn emit(&self, event: DownloadEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Download event receiver dropped");
        }
    }

    async fn run(&self, photo: &Photo, cancel: &CancellationToken) -> Result<Attachment, DownloadError> {
        let progress_tx = self.event_tx.clone();
        let progress_photo = photo.clone();
        let progress_cancel = cancel.clone();
        let progress = move |received: u64, total: Option<u64>| {
            if progress_cancel.is_cancelled() {
                return;
            }
            let _ = progress_tx.send(DownloadEvent::Progress {
                photo: progress_photo.clone(),
                received,
                total,
            });
        };

        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.fetcher.download(&photo.full_image_url, &progress) => result,
        };
        let temp = match fetched {
            Ok(temp) => temp,
            Err(e) if e.is_cancelled() => return Err(DownloadError::Cancelled),
            Err(e) => return Err(e.into()),
        };

        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        self.store(temp, photo).await
    }

    async fn store(&self, temp: TempPath, photo: &Photo) -> Result<Attachment, DownloadError> {
        let mut leading = [0u8; 1];
        let read = tokio::fs::File::open(&temp).await?.read(&mut leading).await?;
        let kind = ImageKind::sniff(&leading[..read]).ok_or(DownloadError::EmptyPayload)?;

        tokio::fs::create_dir_all(&self.attachment_dir).await?;
        let file_name = format!(
            "{}-{}.{}",
            Uuid::new_v4(),
            photo.file_stem().unwrap_or(FALLBACK_STEM),
            kind.extension()
        );
        let destination = self.attachment_dir.join(file_name);

        if let Err(e) = temp.persist(&destination) {
            // Rename fails across filesystems; copy and let the temp file drop.
            debug!(error = %e.error, "Rename failed, copying attachment");
            tokio::fs::copy(&e.path, &destination).await?;
        }
        Ok(Attachment::new(destination, kind))
    }

    /// Reports the outcome and releases the session if it is still current.
    /// Returns an attachment that arrived for a superseded session, which
    /// the caller must remove.
    fn finish(
        &self,
        photo: Photo,
        generation: u64,
        mut result: Result<Attachment, DownloadError>,
    ) -> Option<Attachment> {
        let mut state = self.state.lock();
        let current = state
            .session
            .as_ref()
            .is_some_and(|s| s.generation == generation);

        let mut orphan = None;
        if !current {
            orphan = std::mem::replace(&mut result, Err(DownloadError::Cancelled)).ok();
        }

        match &result {
            Ok(attachment) => {
                info!(url = %photo.full_image_url, path = %attachment.path().display(), kind = %attachment.kind(), "Download finished");
            }
            Err(e) if e.is_cancelled() => {
                debug!(url = %photo.full_image_url, "Download cancelled");
            }
            Err(e) => {
                warn!(url = %photo.full_image_url, error = %e, "Download failed");
            }
        }

        self.emit(DownloadEvent::Finished { photo, result });
        if current {
            state.session = None;
            self.emit(DownloadEvent::CurrentlyDownloadingChanged(None));
        }
        orphan
    }
}
