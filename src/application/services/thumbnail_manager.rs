//! Thumbnail fetch multiplexer.
//!
//! Each URL has at most one fetch in flight no matter how many receivers or
//! prefetch holds want it. A fetch is cancelled once the last receiver has
//! stopped receiving and no prefetch hold remains. All bookkeeping sits
//! behind one mutex, and fetch completions re-enter it before touching state.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::domain::entities::{ReceiverId, Thumbnail, ThumbnailReceiver};
use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::ResourceFetcher;
use crate::infrastructure::image::ThumbnailCache;

struct ActiveFetch {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct FetchState {
    fetch: Option<ActiveFetch>,
    receivers: HashMap<ReceiverId, ThumbnailReceiver>,
    prefetch_holds: usize,
}

impl FetchState {
    fn is_wanted(&self) -> bool {
        !self.receivers.is_empty() || self.prefetch_holds > 0
    }
}

#[derive(Default)]
struct Tables {
    states: HashMap<String, FetchState>,
    next_generation: u64,
}

struct Shared {
    cache: Arc<ThumbnailCache>,
    fetcher: Arc<dyn ResourceFetcher>,
    tables: Mutex<Tables>,
}

/// Multiplexes thumbnail requests from many receivers onto single fetches.
pub struct ThumbnailManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ThumbnailManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailManager")
            .field("tracked", &self.shared.tables.lock().states.len())
            .field("cached", &self.shared.cache.len())
            .finish_non_exhaustive()
    }
}

impl ThumbnailManager {
    #[must_use]
    pub fn new(cache: Arc<ThumbnailCache>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache,
                fetcher,
                tables: Mutex::new(Tables::default()),
            }),
        }
    }

    /// Delivers the thumbnail for `url` to `receiver`, immediately if cached,
    /// otherwise once the (shared) fetch completes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, url: &str, receiver: ThumbnailReceiver) {
        let mut tables = self.shared.tables.lock();
        if let Some(thumbnail) = self.shared.cache.get(url) {
            drop(tables);
            receiver.deliver(url, thumbnail);
            return;
        }

        tables
            .states
            .entry(url.to_string())
            .or_default()
            .receivers
            .insert(receiver.id(), receiver);
        Shared::ensure_fetch(&self.shared, &mut tables, url);
    }

    /// Deregisters a receiver, cancelling the fetch if nobody else wants it.
    pub fn stop_receiving(&self, url: &str, receiver: ReceiverId) {
        let mut tables = self.shared.tables.lock();
        let Some(state) = tables.states.get_mut(url) else {
            return;
        };
        state.receivers.remove(&receiver);
        Shared::cancel_if_unwanted(&mut tables, url);
    }

    /// Starts loading `url` into the cache without a receiver.
    pub fn prefetch(&self, url: &str) {
        let mut tables = self.shared.tables.lock();
        if self.shared.cache.contains(url) {
            return;
        }

        tables
            .states
            .entry(url.to_string())
            .or_default()
            .prefetch_holds += 1;
        Shared::ensure_fetch(&self.shared, &mut tables, url);
    }

    /// Releases one prefetch hold, cancelling the fetch if nobody else wants it.
    pub fn cancel_prefetch(&self, url: &str) {
        let mut tables = self.shared.tables.lock();
        let Some(state) = tables.states.get_mut(url) else {
            return;
        };
        state.prefetch_holds = state.prefetch_holds.saturating_sub(1);
        Shared::cancel_if_unwanted(&mut tables, url);
    }

    /// Cancels every in-flight fetch and forgets all receivers.
    pub fn cancel_all(&self) {
        let mut tables = self.shared.tables.lock();
        let count = tables.states.len();
        for state in tables.states.values() {
            if let Some(fetch) = &state.fetch {
                fetch.cancel.cancel();
            }
        }
        tables.states.clear();
        if count > 0 {
            debug!(count, "Cancelled all thumbnail fetches");
        }
    }

    /// Returns true if a fetch for `url` is in flight.
    #[must_use]
    pub fn is_fetching(&self, url: &str) -> bool {
        self.shared
            .tables
            .lock()
            .states
            .get(url)
            .is_some_and(|s| s.fetch.is_some())
    }

    /// Number of URLs with a fetch in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.shared
            .tables
            .lock()
            .states
            .values()
            .filter(|s| s.fetch.is_some())
            .count()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.shared.cache
    }
}

impl Drop for ThumbnailManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl Shared {
    fn ensure_fetch(this: &Arc<Self>, tables: &mut Tables, url: &str) {
        let generation = tables.next_generation;
        let Some(state) = tables.states.get_mut(url) else {
            return;
        };
        if state.fetch.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        state.fetch = Some(ActiveFetch {
            generation,
            cancel: cancel.clone(),
        });
        tables.next_generation += 1;
        trace!(url, generation, "Starting thumbnail fetch");

        let shared = Arc::clone(this);
        let url = url.to_string();
        tokio::spawn(async move {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(FetchError::Cancelled),
                result = shared.fetcher.fetch(&url) => result,
            };
            let decoded = match fetched {
                Ok(bytes) => decode(bytes).await,
                Err(e) => Err(e),
            };
            shared.finish(&url, generation, decoded);
        });
    }

    fn cancel_if_unwanted(tables: &mut Tables, url: &str) {
        let wanted = tables.states.get(url).is_none_or(FetchState::is_wanted);
        if wanted {
            return;
        }
        if let Some(fetch) = tables.states.remove(url).and_then(|s| s.fetch) {
            fetch.cancel.cancel();
            debug!(url, "Cancelled unwanted thumbnail fetch");
        }
    }

    fn finish(&self, url: &str, generation: u64, result: FetchResult<Thumbnail>) {
        let mut tables = self.tables.lock();
        let current = tables
            .states
            .get(url)
            .and_then(|s| s.fetch.as_ref())
            .map(|f| f.generation);
        if current != Some(generation) {
            trace!(url, generation, "Discarding abandoned thumbnail fetch");
            return;
        }
        let Some(state) = tables.states.remove(url) else {
            return;
        };

        match result {
            Ok(thumbnail) => {
                self.cache.insert(url, thumbnail.clone());
                debug!(url, receivers = state.receivers.len(), "Thumbnail loaded");
                for receiver in state.receivers.values() {
                    receiver.deliver(url, thumbnail.clone());
                }
            }
            Err(e) if e.is_cancelled() => {
                trace!(url, "Thumbnail fetch cancelled");
            }
            Err(e) => {
                warn!(url, error = %e, "Couldn't load thumbnail");
            }
        }
    }
}

async fn decode(bytes: Bytes) -> FetchResult<Thumbnail> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| FetchError::Decode(format!("Decode task panicked: {e}")))?
        .map(Arc::new)
        .map_err(|e| FetchError::Decode(format!("Failed to decode image: {e}")))
}
