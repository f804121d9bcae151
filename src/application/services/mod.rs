pub mod attachment_downloader;
pub mod search_coordinator;
pub mod search_manager;
pub mod thumbnail_manager;

pub use attachment_downloader::{AttachmentDownloader, DownloadEvent};
pub use search_coordinator::{DEFAULT_CONCURRENT_LIMIT, SearchCoordinator, SearchEvent};
pub use search_manager::{DEFAULT_IDEAL_TOTAL, MIN_PER_PROVIDER, ProviderInfo, StockPhotoSearchManager};
pub use thumbnail_manager::ThumbnailManager;
