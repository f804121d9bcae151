//! Search backend port: one implementation per stock photo provider.

use async_trait::async_trait;

use crate::domain::entities::SearchResult;
use crate::domain::errors::SearchError;

/// Port for executing one page of a query against a provider.
///
/// Implementations own request construction and response parsing.
/// Cancellation is expressed by the caller dropping the returned future.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Stable internal identifier, used for the disabled-provider list.
    fn identifier(&self) -> &str;

    /// User-facing provider name.
    fn display_name(&self) -> &str;

    /// Fetches `count` photos for `query`, continuing after `after` if given.
    async fn search(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<SearchResult, SearchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    /// A recorded call to [`MockSearchBackend::search`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SearchCall {
        pub query: String,
        pub count: usize,
        pub after: Option<String>,
    }

    /// Scripted backend for testing.
    ///
    /// Responses are returned in order; once exhausted every call yields an
    /// empty final page. A gated backend holds each call until a permit is
    /// released.
    pub struct MockSearchBackend {
        identifier: String,
        responses: Mutex<VecDeque<Result<SearchResult, SearchError>>>,
        calls: Mutex<Vec<SearchCall>>,
        gate: Option<Arc<Semaphore>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        dropped: AtomicUsize,
    }

    impl MockSearchBackend {
        /// Creates a backend that answers immediately.
        pub fn new(identifier: impl Into<String>) -> Self {
            Self {
                identifier: identifier.into(),
                responses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                gate: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                dropped: AtomicUsize::new(0),
            }
        }

        /// Creates a backend whose calls wait for [`Self::release`].
        pub fn gated(identifier: impl Into<String>) -> Self {
            Self {
                gate: Some(Arc::new(Semaphore::new(0))),
                ..Self::new(identifier)
            }
        }

        pub fn respond_with(self, response: Result<SearchResult, SearchError>) -> Self {
            self.responses.lock().push_back(response);
            self
        }

        /// Lets `n` held calls proceed.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        pub fn calls(&self) -> Vec<SearchCall> {
            self.calls.lock().clone()
        }

        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Number of calls abandoned before they produced a result.
        pub fn dropped(&self) -> usize {
            self.dropped.load(Ordering::SeqCst)
        }
    }

    struct InFlight<'a> {
        backend: &'a MockSearchBackend,
        finished: bool,
    }

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.backend.in_flight.fetch_sub(1, Ordering::SeqCst);
            if !self.finished {
                self.backend.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[async_trait]
    impl SearchBackend for MockSearchBackend {
        fn identifier(&self) -> &str {
            &self.identifier
        }

        fn display_name(&self) -> &str {
            &self.identifier
        }

        async fn search(
            &self,
            query: &str,
            count: usize,
            after: Option<&str>,
        ) -> Result<SearchResult, SearchError> {
            self.calls.lock().push(SearchCall {
                query: query.to_string(),
                count,
                after: after.map(String::from),
            });
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let mut guard = InFlight {
                backend: self,
                finished: false,
            };

            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            guard.finished = true;
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchResult::default()))
        }
    }
}
