//! # Cache System
//!
//! On-disk cache of release assets, laid out as `{cache_root}/{tag}/{asset}`.
//! Entries are written to a temporary sibling and renamed into place, so a
//! committed path is always a complete copy.

mod store;
mod types;
mod utils;

pub use store::CacheStore;
pub use types::{AssetSyncStatus, CacheKey, EnsureStatus, SyncEntry, SyncReport};
pub use utils::TEMP_SUFFIX;
