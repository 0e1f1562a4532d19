//! # Download Service
//!
//! Resolves a requested `(tag, asset)` to a committed cache file, fetching
//! it on demand when the tag is the current release.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::error::DownloadError;
use crate::state::VersionState;

/// A cache file ready to be streamed to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedAsset {
    pub path: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct DownloadService {
    state: Arc<VersionState>,
    store: Arc<CacheStore>,
    auth_token: Option<String>,
}

impl DownloadService {
    pub fn new(
        state: Arc<VersionState>,
        store: Arc<CacheStore>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            state,
            store,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    pub async fn resolve(&self, tag: &str, asset: &str) -> Result<ServedAsset, DownloadError> {
        let key = CacheKey::new(tag, asset).map_err(|e| {
            debug!(tag, asset, error = %e, "Rejected download path");
            DownloadError::BadRequest(e)
        })?;

        let current = self.state.current();
        let declared = current
            .as_deref()
            .filter(|release| release.tag == key.tag())
            .and_then(|release| release.asset(key.asset()));

        let cached = match declared {
            Some(a) => self.store.is_valid(&key, a.size_bytes).await,
            None => self.store.is_committed(&key).await,
        };
        if cached {
            debug!(key = %key, "Serving asset from cache");
            return Ok(self.served(&key));
        }

        let Some(release) = current.as_deref().filter(|r| r.tag == key.tag()) else {
            return Err(DownloadError::NotFound("version not found".to_owned()));
        };
        let Some(asset) = declared else {
            return Err(DownloadError::NotFound(format!(
                "file not found in release {}",
                release.tag
            )));
        };

        self.store
            .ensure(
                &key,
                asset.size_bytes,
                &asset.source_url,
                self.auth_token.as_deref(),
            )
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "On-demand download failed");
                DownloadError::Internal(e)
            })?;

        Ok(self.served(&key))
    }

    fn served(&self, key: &CacheKey) -> ServedAsset {
        ServedAsset {
            path: self.store.path_for(key),
            file_name: key.asset().to_owned(),
        }
    }
}
