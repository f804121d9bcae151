//! stock-search - concurrent stock photo search across several providers.
//!
//! This crate provides the search coordination core (bounded fan-out,
//! continuation paging, provider registry), an interest-driven thumbnail
//! fetcher over an LRU cache, and a single-slot attachment downloader.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the search, thumbnail and download services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "stock-search";
