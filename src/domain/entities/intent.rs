//! Search intents: one page request against one provider.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

static NEXT_INTENT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-instance identity of a [`SearchIntent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentId(u64);

impl IntentId {
    fn next() -> Self {
        Self(NEXT_INTENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "intent-{}", self.0)
    }
}

/// A request for one page of results from one provider.
///
/// Intents are compared by identity: two intents created separately are
/// distinct even when query and provider match.
#[derive(Debug)]
pub struct SearchIntent {
    id: IntentId,
    query: String,
    continuation_token: Option<String>,
    provider_index: usize,
    count: usize,
    cancel: CancellationToken,
}

impl SearchIntent {
    /// Creates a fresh intent with its own identity and cancel handle.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        continuation_token: Option<String>,
        provider_index: usize,
        count: usize,
    ) -> Self {
        Self {
            id: IntentId::next(),
            query: query.into(),
            continuation_token,
            provider_index,
            count,
            cancel: CancellationToken::new(),
        }
    }

    /// Derives the intent for the following page of the same provider.
    #[must_use]
    pub fn next_page(&self, continuation_token: impl Into<String>) -> Self {
        Self::new(
            self.query.clone(),
            Some(continuation_token.into()),
            self.provider_index,
            self.count,
        )
    }

    #[must_use]
    pub const fn id(&self) -> IntentId {
        self.id
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    #[must_use]
    pub const fn provider_index(&self) -> usize {
        self.provider_index
    }

    /// Page size requested from the provider.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns a handle that observes or triggers cancellation of this intent.
    #[must_use]
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cancellation of the in-flight call, if any.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl PartialEq for SearchIntent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SearchIntent {}

impl std::hash::Hash for SearchIntent {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
