mod resource_fetcher_port;
mod search_backend_port;

pub use resource_fetcher_port::{ProgressFn, ResourceFetcher};
pub use search_backend_port::SearchBackend;

#[cfg(test)]
pub mod mocks {
    pub use super::resource_fetcher_port::mock::MockResourceFetcher;
    pub use super::search_backend_port::mock::{MockSearchBackend, SearchCall};
}
