//! # Version State
//!
//! Holds the current release descriptor. Readers clone an `Arc` under a read
//! lock; a refresh performs its network call without any lock and only takes
//! the write lock to swap the pointer.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::release::ReleaseDescriptor;
use crate::source::ReleaseSource;

pub struct VersionState {
    source: Arc<dyn ReleaseSource>,
    current: RwLock<Option<Arc<ReleaseDescriptor>>>,
}

impl VersionState {
    pub fn new(source: Arc<dyn ReleaseSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    /// The held descriptor, or `None` if no refresh has succeeded yet.
    pub fn current(&self) -> Option<Arc<ReleaseDescriptor>> {
        self.current.read().clone()
    }

    /// Swap in a new descriptor, returning the one it supersedes.
    pub fn replace(&self, release: ReleaseDescriptor) -> Option<Arc<ReleaseDescriptor>> {
        let release = Arc::new(release);
        self.current.write().replace(release)
    }

    /// Fetch the latest release and make it current.
    ///
    /// On failure the previously held descriptor is left untouched.
    pub async fn refresh(&self) -> Result<Arc<ReleaseDescriptor>, FetchError> {
        let release = match self.source.fetch_latest().await {
            Ok(release) => Arc::new(release),
            Err(e) => {
                warn!(error = %e, "Failed to refresh release metadata");
                return Err(e);
            }
        };

        let previous = self.current.write().replace(release.clone());
        match previous {
            Some(prev) if prev.tag != release.tag => {
                info!(from = %prev.tag, to = %release.tag, "Release updated")
            }
            Some(_) => info!(tag = %release.tag, "Release metadata refreshed"),
            None => info!(tag = %release.tag, "Release metadata loaded"),
        }
        Ok(release)
    }
}

impl std::fmt::Debug for VersionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionState")
            .field("current", &self.current().map(|r| r.tag.clone()))
            .finish_non_exhaustive()
    }
}
