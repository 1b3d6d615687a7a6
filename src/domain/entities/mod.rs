//! Domain entity definitions.

mod cache_entry;
mod cache_key;
mod handle;
mod load_state;
mod object_url;
mod remote_image;

pub use cache_entry::{CacheEntry, is_expired_at};
pub use cache_key::CacheKey;
pub use handle::{HandleKind, ResolvedHandle};
pub use load_state::{ImageView, LoadState, LoadStatus};
pub use object_url::{OBJECT_URL_PREFIX, ObjectUrl, ObjectUrlRegistry};
pub use remote_image::RemoteImage;
