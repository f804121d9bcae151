//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Thumbnail caching and HTTP fetching.
pub mod image;
/// Persistent photo lists.
pub mod photo_store;
/// Built-in search providers.
pub mod providers;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use image::{CacheStats, HttpResourceFetcher, ThumbnailCache};
pub use photo_store::{PhotoStore, StoreError};
pub use providers::{AdobeBackend, BigstockBackend, IStockBackend, ShutterstockBackend};
