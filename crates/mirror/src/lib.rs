//! # Mirror Engine
//!
//! Keeps a local mirror of the latest release of one upstream repository.
//!
//! - [`VersionState`] holds the most recently fetched [`ReleaseDescriptor`].
//! - [`CacheStore`] keeps assets on disk as `{cache_root}/{tag}/{asset}` and
//!   only ever exposes complete files.
//! - [`RefreshCoordinator`] serializes refresh-then-sync runs coming from
//!   startup, a periodic timer and inbound webhooks.
//! - [`NotificationIngester`] authenticates and filters release webhooks.
//! - [`DownloadService`] resolves client download requests against the cache.

pub mod cache;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod domains;
pub mod download;
pub mod error;
pub mod notify;
pub mod release;
pub mod source;
pub mod state;
pub mod update;

#[cfg(test)]
mod test_support;

pub use cache::{AssetSyncStatus, CacheKey, CacheStore, EnsureStatus, SyncReport};
pub use client::create_client;
pub use config::MirrorConfig;
pub use coordinator::{RefreshCoordinator, RefreshOutcome, RefreshTrigger};
pub use domains::{DomainsClient, DomainsError};
pub use download::{DownloadService, ServedAsset};
pub use error::{CacheError, DownloadError, FetchError, IngestError, ValidationError};
pub use notify::{InboundNotification, IngestOutcome, NotificationIngester};
pub use release::{Asset, ReleaseDescriptor};
pub use source::{GithubReleaseSource, ReleaseSource};
pub use state::VersionState;
pub use update::{UpdateCheck, check_update};
