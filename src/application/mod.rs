//! Application layer: search coordination, thumbnail and download services.

/// Stateful services driven by the front end.
pub mod services;

pub use services::{
    AttachmentDownloader, DownloadEvent, SearchCoordinator, SearchEvent, StockPhotoSearchManager,
    ThumbnailManager,
};
