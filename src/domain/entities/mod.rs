//! Domain entity definitions.

mod attachment;
mod intent;
mod photo;
mod thumbnail;

pub use attachment::{Attachment, ImageKind};
pub use intent::{IntentId, SearchIntent};
pub use photo::{Photo, SearchResult};
pub use thumbnail::{ReceiverId, Thumbnail, ThumbnailLoadedEvent, ThumbnailReceiver};
