//! Provider registry: which backends exist, which are enabled, and how a
//! query is split into starting intents.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::domain::entities::{SearchIntent, SearchResult};
use crate::domain::errors::{RegistryError, SearchError};
use crate::domain::ports::SearchBackend;

/// Default number of results wanted once the first round of pages is in.
pub const DEFAULT_IDEAL_TOTAL: usize = 30;

/// Smallest page size ever requested from a provider.
pub const MIN_PER_PROVIDER: usize = 3;

/// Summary of one registered provider, for settings surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub identifier: String,
    pub display_name: String,
    pub enabled: bool,
}

/// Owns the ordered provider list and the persisted exclusion list.
pub struct StockPhotoSearchManager {
    backends: Vec<Arc<dyn SearchBackend>>,
    disabled: RwLock<HashSet<String>>,
    ideal_total: AtomicUsize,
}

impl std::fmt::Debug for StockPhotoSearchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockPhotoSearchManager")
            .field("providers", &self.backends.len())
            .field("disabled", &*self.disabled.read())
            .field("ideal_total", &self.ideal_total())
            .finish()
    }
}

impl StockPhotoSearchManager {
    /// Creates a registry over `backends`, in registration order.
    ///
    /// A disabled set that would exclude every backend is ignored entirely.
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>, disabled: HashSet<String>) -> Self {
        let manager = Self {
            backends,
            disabled: RwLock::new(disabled),
            ideal_total: AtomicUsize::new(DEFAULT_IDEAL_TOTAL),
        };
        if !manager.backends.is_empty() && manager.enabled_count() == 0 {
            warn!("Persisted provider exclusions disable every provider, ignoring them");
            manager.disabled.write().clear();
        }
        manager
    }

    /// Number of registered providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.backends.len()
    }

    /// Returns the backend at `index`, if registered.
    #[must_use]
    pub fn backend(&self, index: usize) -> Option<&Arc<dyn SearchBackend>> {
        self.backends.get(index)
    }

    /// Lists every provider with its enabled state.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderInfo> {
        let disabled = self.disabled.read();
        self.backends
            .iter()
            .map(|b| ProviderInfo {
                identifier: b.identifier().to_string(),
                display_name: b.display_name().to_string(),
                enabled: !disabled.contains(b.identifier()),
            })
            .collect()
    }

    /// Identifiers currently excluded, sorted for stable persistence.
    #[must_use]
    pub fn disabled_identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.disabled.read().iter().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn is_enabled(&self, identifier: &str) -> bool {
        !self.disabled.read().contains(identifier)
    }

    /// Number of registered providers not excluded.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        let disabled = self.disabled.read();
        self.backends
            .iter()
            .filter(|b| !disabled.contains(b.identifier()))
            .count()
    }

    /// Enables or disables a provider.
    ///
    /// # Errors
    /// Returns `UnknownProvider` for an unregistered identifier and
    /// `LastProvider` if disabling would leave no provider enabled.
    pub fn set_enabled(&self, identifier: &str, enabled: bool) -> Result<(), RegistryError> {
        if !self.backends.iter().any(|b| b.identifier() == identifier) {
            return Err(RegistryError::UnknownProvider(identifier.to_string()));
        }

        let mut disabled = self.disabled.write();
        if enabled {
            if disabled.remove(identifier) {
                info!(provider = identifier, "Provider enabled");
            }
            return Ok(());
        }

        if disabled.contains(identifier) {
            return Ok(());
        }
        let remaining = self
            .backends
            .iter()
            .filter(|b| b.identifier() != identifier && !disabled.contains(b.identifier()))
            .count();
        if remaining == 0 {
            warn!(provider = identifier, "Refusing to disable the last enabled provider");
            return Err(RegistryError::LastProvider(identifier.to_string()));
        }

        disabled.insert(identifier.to_string());
        info!(provider = identifier, "Provider disabled");
        Ok(())
    }

    #[must_use]
    pub fn ideal_total(&self) -> usize {
        self.ideal_total.load(Ordering::Relaxed)
    }

    /// Tunes how many results a search should gather across providers.
    /// Only intents created afterwards see the new value.
    pub fn set_ideal_total(&self, total: usize) {
        self.ideal_total.store(total, Ordering::Relaxed);
    }

    /// Page size requested from each enabled provider.
    #[must_use]
    pub fn per_provider_count(&self) -> usize {
        let enabled = self.enabled_count().max(1);
        (self.ideal_total() / enabled).max(MIN_PER_PROVIDER)
    }

    /// Creates one first-page intent per enabled provider, shuffled so the
    /// same provider is not always first.
    #[must_use]
    pub fn starting_intents(&self, query: &str) -> Vec<SearchIntent> {
        let count = self.per_provider_count();
        let mut indices: Vec<usize> = {
            let disabled = self.disabled.read();
            self.backends
                .iter()
                .enumerate()
                .filter(|(_, b)| !disabled.contains(b.identifier()))
                .map(|(i, _)| i)
                .collect()
        };
        indices.shuffle(&mut rand::thread_rng());

        debug!(query, providers = indices.len(), count, "Created starting intents");
        indices
            .into_iter()
            .map(|index| SearchIntent::new(query, None, index, count))
            .collect()
    }

    /// Executes an intent against its provider.
    ///
    /// # Errors
    /// Returns the provider's error, or `InvalidRequest` if the intent names
    /// an unknown provider.
    pub async fn search(&self, intent: &SearchIntent) -> Result<SearchResult, SearchError> {
        let backend = self.backend(intent.provider_index()).ok_or_else(|| {
            SearchError::invalid_request(format!(
                "no provider at index {}",
                intent.provider_index()
            ))
        })?;
        backend
            .search(intent.query(), intent.count(), intent.continuation_token())
            .await
    }
}
