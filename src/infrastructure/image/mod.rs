//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching of decoded thumbnails with LRU eviction
//! - HTTP fetching of thumbnails and attachments

pub mod http_fetcher;
pub mod memory_cache;

pub use http_fetcher::HttpResourceFetcher;
pub use memory_cache::{CacheStats, ThumbnailCache};
