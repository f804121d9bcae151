//! Bounded fan-out of search intents with token-based continuation.
//!
//! At most `concurrent_limit` intents run at once. Intents beyond that wait
//! in a FIFO queue, together with continuation intents derived from pages
//! that returned a token. Queued intents only start when the caller asks for
//! more via [`SearchCoordinator::run_next`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::entities::{IntentId, Photo, SearchIntent, SearchResult};
use crate::domain::errors::SearchError;

use super::search_manager::StockPhotoSearchManager;

/// Default maximum number of intents running simultaneously.
pub const DEFAULT_CONCURRENT_LIMIT: usize = 3;

/// Progress of the current search, in the order it happened.
///
/// For a completed page `PhotosAdded` is always sent before the matching
/// `StateChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// One provider page arrived.
    PhotosAdded(Vec<Photo>),
    /// The running set changed.
    StateChanged {
        /// Whether any intent is still running.
        busy: bool,
    },
}

struct CoordinatorState {
    running: HashMap<IntentId, CancellationToken>,
    pending: VecDeque<SearchIntent>,
    concurrent_limit: usize,
}

struct Shared {
    manager: Arc<StockPhotoSearchManager>,
    state: Mutex<CoordinatorState>,
    event_tx: mpsc::UnboundedSender<SearchEvent>,
}

/// Runs search intents with a concurrency bound and reports results as
/// [`SearchEvent`]s.
pub struct SearchCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SearchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SearchCoordinator")
            .field("running", &state.running.len())
            .field("pending", &state.pending.len())
            .field("concurrent_limit", &state.concurrent_limit)
            .finish_non_exhaustive()
    }
}

impl SearchCoordinator {
    /// Creates a coordinator with the default concurrency limit.
    #[must_use]
    pub fn new(
        manager: Arc<StockPhotoSearchManager>,
        event_tx: &mpsc::UnboundedSender<SearchEvent>,
    ) -> Self {
        Self::with_limit(manager, event_tx, DEFAULT_CONCURRENT_LIMIT)
    }

    /// Creates a coordinator running at most `concurrent_limit` intents.
    /// A zero limit is raised to one.
    #[must_use]
    pub fn with_limit(
        manager: Arc<StockPhotoSearchManager>,
        event_tx: &mpsc::UnboundedSender<SearchEvent>,
        concurrent_limit: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                manager,
                state: Mutex::new(CoordinatorState {
                    running: HashMap::new(),
                    pending: VecDeque::new(),
                    concurrent_limit: concurrent_limit.max(1),
                }),
                event_tx: event_tx.clone(),
            }),
        }
    }

    /// Starts the first search round for `query` using the registry's
    /// starting intents.
    pub fn start(&self, query: &str) {
        let intents = self.shared.manager.starting_intents(query);
        self.run(intents);
    }

    /// Starts as many `intents` as capacity allows and queues the rest.
    ///
    /// Must be called from within a tokio runtime. Emits one
    /// `StateChanged` before returning.
    pub fn run(&self, intents: impl IntoIterator<Item = SearchIntent>) {
        let mut state = self.shared.state.lock();
        let mut intents = intents.into_iter();

        while state.running.len() < state.concurrent_limit {
            let Some(intent) = intents.next() else {
                break;
            };
            Shared::admit(&self.shared, &mut state, intent);
        }
        let before = state.pending.len();
        state.pending.extend(intents);
        if state.pending.len() > before {
            debug!(queued = state.pending.len() - before, "Queued intents over capacity");
        }

        self.shared.emit_state(&state);
    }

    /// Starts queued intents up to the remaining capacity. No-op when
    /// nothing is queued.
    pub fn run_next(&self) {
        let mut state = self.shared.state.lock();
        if state.pending.is_empty() {
            return;
        }

        while state.running.len() < state.concurrent_limit {
            let Some(intent) = state.pending.pop_front() else {
                break;
            };
            Shared::admit(&self.shared, &mut state, intent);
        }

        self.shared.emit_state(&state);
    }

    /// Cancels every running intent and forgets all queued ones.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        let was_busy = !state.running.is_empty();

        for cancel in state.running.values() {
            cancel.cancel();
        }
        let cancelled = state.running.len();
        let dropped = state.pending.len();
        state.running.clear();
        state.pending.clear();

        if was_busy || dropped > 0 {
            debug!(cancelled, dropped, "Reset search intents");
        }
        if was_busy {
            self.shared.emit_state(&state);
        }
    }

    /// Returns true while any intent is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.shared.state.lock().running.is_empty()
    }

    #[must_use]
    pub fn running_count(&self) -> usize {
        self.shared.state.lock().running.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns true if more pages can be requested with [`Self::run_next`].
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.shared.state.lock().pending.is_empty()
    }

    #[must_use]
    pub fn concurrent_limit(&self) -> usize {
        self.shared.state.lock().concurrent_limit
    }

    /// Changes the limit for future admissions. Running intents are not
    /// cancelled when the limit shrinks.
    pub fn set_concurrent_limit(&self, limit: usize) {
        self.shared.state.lock().concurrent_limit = limit.max(1);
    }

    /// The registry this coordinator executes against.
    #[must_use]
    pub fn manager(&self) -> &Arc<StockPhotoSearchManager> {
        &self.shared.manager
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        let state = self.shared.state.lock();
        for cancel in state.running.values() {
            cancel.cancel();
        }
    }
}

impl Shared {
    fn admit(this: &Arc<Self>, state: &mut CoordinatorState, intent: SearchIntent) {
        let cancel = intent.cancel_handle();
        state.running.insert(intent.id(), cancel.clone());
        debug!(
            intent = %intent.id(),
            provider = intent.provider_index(),
            query = intent.query(),
            after = intent.continuation_token(),
            "Running search intent"
        );

        let shared = Arc::clone(this);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(SearchError::Cancelled),
                result = shared.manager.search(&intent) => result,
            };
            shared.complete(intent, outcome);
        });
    }

    fn complete(&self, intent: SearchIntent, outcome: Result<SearchResult, SearchError>) {
        let mut state = self.state.lock();

        if state.running.remove(&intent.id()).is_none() {
            // Dropped by reset; its results belong to an abandoned search.
            debug!(intent = %intent.id(), "Discarding completion of reset intent");
            return;
        }

        match outcome {
            Ok(result) => {
                debug!(
                    intent = %intent.id(),
                    photos = result.photos.len(),
                    more = result.has_more(),
                    "Search intent finished"
                );
                self.send(SearchEvent::PhotosAdded(result.photos));
                if let Some(token) = result.continuation_token {
                    state.pending.push_back(intent.next_page(token));
                }
            }
            Err(e) if e.is_cancelled() => {
                debug!(intent = %intent.id(), "Search intent cancelled");
            }
            Err(e) => {
                warn!(
                    intent = %intent.id(),
                    provider = intent.provider_index(),
                    query = intent.query(),
                    error = %e,
                    "Failed to retrieve results for intent"
                );
            }
        }

        self.emit_state(&state);
    }

    fn emit_state(&self, state: &CoordinatorState) {
        self.send(SearchEvent::StateChanged {
            busy: !state.running.is_empty(),
        });
    }

    fn send(&self, event: SearchEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Search event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use crate::domain::ports::SearchBackend;
    use crate::domain::ports::mocks::MockSearchBackend;

    fn photos(prefix: &str, n: usize) -> Vec<Photo> {
        (0..n)
            .map(|i| Photo::new(format!("https://{prefix}/{i}.jpg")))
            .collect()
    }

    fn registry(backends: Vec<Arc<MockSearchBackend>>) -> Arc<StockPhotoSearchManager> {
        let backends = backends
            .into_iter()
            .map(|b| b as Arc<dyn SearchBackend>)
            .collect();
        Arc::new(StockPhotoSearchManager::new(backends, HashSet::new()))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SearchEvent>) -> SearchEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for search event")
            .expect("event channel closed")
    }

    /// Collects events until `completions` intents have reported back.
    async fn collect_completions(
        rx: &mut mpsc::UnboundedReceiver<SearchEvent>,
        completions: usize,
    ) -> (Vec<Photo>, Vec<SearchEvent>) {
        let mut photos = Vec::new();
        let mut events = Vec::new();
        let mut seen = 0;
        while seen < completions {
            let event = next_event(rx).await;
            match &event {
                SearchEvent::PhotosAdded(batch) => photos.extend(batch.iter().cloned()),
                SearchEvent::StateChanged { .. } => seen += 1,
            }
            events.push(event);
        }
        (photos, events)
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_cats_scenario() {
        let a = Arc::new(
            MockSearchBackend::new("a")
                .respond_with(Ok(SearchResult::new(photos("a", 10), Some("a-2".into())))),
        );
        let b = Arc::new(
            MockSearchBackend::new("b").respond_with(Ok(SearchResult::new(photos("b", 8), None))),
        );
        let c = Arc::new(
            MockSearchBackend::new("c").respond_with(Err(SearchError::network("connection reset"))),
        );
        let manager = registry(vec![a.clone(), b.clone(), c.clone()]);
        manager.set_ideal_total(30);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(manager, &tx);
        coordinator.start("cats");

        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: true });
        let (results, events) = collect_completions(&mut rx, 3).await;

        assert_eq!(results.len(), 18);
        assert_eq!(events.last(), Some(&SearchEvent::StateChanged { busy: false }));
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.pending_count(), 1);
        for backend in [&a, &b, &c] {
            let calls = backend.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].count, 10);
            assert_eq!(calls[0].after, None);
        }

        coordinator.run_next();
        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: true });
        collect_completions(&mut rx, 1).await;
        let calls = a.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].after.as_deref(), Some("a-2"));
        assert_eq!(calls[1].count, 10);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_photos_added_precedes_state_change() {
        let a = Arc::new(
            MockSearchBackend::new("a").respond_with(Ok(SearchResult::new(photos("a", 2), None))),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(registry(vec![a]), &tx);
        coordinator.start("q");

        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: true });
        assert!(matches!(next_event(&mut rx).await, SearchEvent::PhotosAdded(p) if p.len() == 2));
        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: false });
    }

    #[tokio::test]
    async fn test_fan_out_never_exceeds_limit() {
        let backend = Arc::new(MockSearchBackend::gated("a"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(registry(vec![backend.clone()]), &tx);

        coordinator.run((0..7).map(|_| SearchIntent::new("q", None, 0, 3)));
        assert_eq!(coordinator.running_count(), 3);
        assert_eq!(coordinator.pending_count(), 4);
        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: true });
        eventually(|| backend.in_flight() == 3).await;

        let mut completed = 0;
        while completed < 7 {
            assert!(coordinator.running_count() <= 3);
            backend.release(1);
            while !matches!(next_event(&mut rx).await, SearchEvent::PhotosAdded(_)) {}
            completed += 1;
            coordinator.run_next();
        }

        assert_eq!(backend.calls().len(), 7);
        assert_eq!(backend.max_in_flight(), 3);
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_run_without_capacity_queues_everything() {
        let backend = Arc::new(MockSearchBackend::gated("a"));
        let (tx, _rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::with_limit(registry(vec![backend.clone()]), &tx, 1);

        coordinator.run([SearchIntent::new("q", None, 0, 3)]);
        coordinator.run([
            SearchIntent::new("q", None, 0, 3),
            SearchIntent::new("q", None, 0, 3),
        ]);

        assert_eq!(coordinator.running_count(), 1);
        assert_eq!(coordinator.pending_count(), 2);
        eventually(|| backend.in_flight() == 1).await;
    }

    #[tokio::test]
    async fn test_continuation_waits_behind_earlier_intents() {
        let a = Arc::new(
            MockSearchBackend::new("a")
                .respond_with(Ok(SearchResult::new(photos("a", 1), Some("a-2".into())))),
        );
        let b = Arc::new(MockSearchBackend::new("b"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::with_limit(registry(vec![a.clone(), b.clone()]), &tx, 1);

        coordinator.run([
            SearchIntent::new("q", None, 0, 5),
            SearchIntent::new("q", None, 1, 5),
        ]);
        next_event(&mut rx).await;
        collect_completions(&mut rx, 1).await;

        // Not auto-admitted: b's first page and a's continuation both wait.
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.pending_count(), 2);
        assert!(b.calls().is_empty());

        coordinator.run_next();
        next_event(&mut rx).await;
        collect_completions(&mut rx, 1).await;
        assert_eq!(b.calls().len(), 1);
        assert_eq!(a.calls().len(), 1);

        coordinator.run_next();
        next_event(&mut rx).await;
        collect_completions(&mut rx, 1).await;
        assert_eq!(a.calls().len(), 2);
        assert_eq!(a.calls()[1].after.as_deref(), Some("a-2"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let ok1 = Arc::new(
            MockSearchBackend::new("ok1").respond_with(Ok(SearchResult::new(photos("1", 4), None))),
        );
        let bad = Arc::new(MockSearchBackend::new("bad").respond_with(Err(SearchError::Http {
            status: 500,
        })));
        let ok2 = Arc::new(
            MockSearchBackend::new("ok2").respond_with(Ok(SearchResult::new(photos("2", 5), None))),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(registry(vec![ok1, bad, ok2]), &tx);

        coordinator.start("q");
        next_event(&mut rx).await;
        let (results, _) = collect_completions(&mut rx, 3).await;

        assert_eq!(results.len(), 9);
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_cancels_running_and_discards_results() {
        let backend = Arc::new(
            MockSearchBackend::gated("a")
                .respond_with(Ok(SearchResult::new(photos("a", 3), Some("2".into()))))
                .respond_with(Ok(SearchResult::new(photos("a", 3), Some("2".into())))),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::with_limit(registry(vec![backend.clone()]), &tx, 2);

        coordinator.run((0..3).map(|_| SearchIntent::new("q", None, 0, 3)));
        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: true });
        eventually(|| backend.in_flight() == 2).await;

        coordinator.reset();
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(next_event(&mut rx).await, SearchEvent::StateChanged { busy: false });

        eventually(|| backend.dropped() == 2).await;
        backend.release(2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent_when_idle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(registry(vec![Arc::new(MockSearchBackend::new("a"))]), &tx);

        coordinator.reset();
        coordinator.reset();
        assert!(!coordinator.is_busy());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_next_without_pending_is_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = SearchCoordinator::new(registry(vec![Arc::new(MockSearchBackend::new("a"))]), &tx);

        coordinator.run_next();
        assert!(rx.try_recv().is_err());
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_zero_limit_is_raised_to_one() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let coordinator =
            SearchCoordinator::with_limit(registry(vec![Arc::new(MockSearchBackend::new("a"))]), &tx, 0);
        assert_eq!(coordinator.concurrent_limit(), 1);
        coordinator.set_concurrent_limit(0);
        assert_eq!(coordinator.concurrent_limit(), 1);
    }
}
