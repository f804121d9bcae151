//! Domain error types.

mod fetch_error;
mod search_error;

pub use fetch_error::{DownloadError, FetchError, FetchResult};
pub use search_error::{RegistryError, SearchError};
