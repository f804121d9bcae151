//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{Attachment, ImageKind, Photo, SearchIntent, SearchResult};
pub use errors::{DownloadError, FetchError, RegistryError, SearchError};
pub use ports::{ResourceFetcher, SearchBackend};
