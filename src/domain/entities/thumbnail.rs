//! Thumbnail receivers and delivery events.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// A decoded preview image shared between the cache and receivers.
pub type Thumbnail = Arc<image::DynamicImage>;

static NEXT_RECEIVER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a thumbnail consumer (typically one grid cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u64);

impl ReceiverId {
    /// Allocates a new process-unique identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RECEIVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

/// Delivered to a receiver once the thumbnail for `url` is available.
#[derive(Debug, Clone)]
pub struct ThumbnailLoadedEvent {
    /// Which receiver asked for it.
    pub receiver: ReceiverId,
    /// The resource URL the thumbnail was fetched from.
    pub url: String,
    /// The decoded image.
    pub thumbnail: Thumbnail,
}

/// A consumer registered with the thumbnail manager.
///
/// Delivery goes through an unbounded channel so it never blocks and never
/// calls back into the manager.
#[derive(Debug, Clone)]
pub struct ThumbnailReceiver {
    id: ReceiverId,
    tx: mpsc::UnboundedSender<ThumbnailLoadedEvent>,
}

impl ThumbnailReceiver {
    /// Creates a receiver with a fresh identity.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<ThumbnailLoadedEvent>) -> Self {
        Self::with_id(ReceiverId::next(), tx)
    }

    #[must_use]
    pub const fn with_id(id: ReceiverId, tx: mpsc::UnboundedSender<ThumbnailLoadedEvent>) -> Self {
        Self { id, tx }
    }

    #[must_use]
    pub const fn id(&self) -> ReceiverId {
        self.id
    }

    /// Sends the thumbnail. A dropped consumer is not an error.
    pub fn deliver(&self, url: &str, thumbnail: Thumbnail) {
        let event = ThumbnailLoadedEvent {
            receiver: self.id,
            url: url.to_string(),
            thumbnail,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(receiver = %self.id, url, "Thumbnail receiver gone");
        }
    }
}
