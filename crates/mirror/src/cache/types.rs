//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::fmt;
use std::path::PathBuf;

use crate::cache::utils::validate_component;
use crate::error::ValidationError;

/// Identity of one cached asset: a validated `(tag, asset name)` pair.
///
/// Both components are checked on construction, so a `CacheKey` can always
/// be joined onto the cache root without escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tag: String,
    asset: String,
}

impl CacheKey {
    pub fn new(tag: impl Into<String>, asset: impl Into<String>) -> Result<Self, ValidationError> {
        let tag = tag.into();
        let asset = asset.into();
        validate_component("version", &tag)?;
        validate_component("file name", &asset)?;
        if asset.ends_with(super::utils::TEMP_SUFFIX) {
            return Err(ValidationError::Reserved {
                field: "file name",
                value: asset,
            });
        }
        Ok(Self { tag, asset })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Path of the entry relative to the cache root: `{tag}/{asset}`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.tag).join(&self.asset)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag, self.asset)
    }
}

/// How `ensure` satisfied a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureStatus {
    /// A valid copy was already on disk
    Cached,
    /// The asset was fetched and committed
    Downloaded,
}

/// Per-asset result of a batch sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSyncStatus {
    Cached,
    Downloaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEntry {
    pub name: String,
    pub status: AssetSyncStatus,
}

/// Outcome of syncing every asset of one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub tag: String,
    pub entries: Vec<SyncEntry>,
}

impl SyncReport {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, status: AssetSyncStatus) {
        self.entries.push(SyncEntry {
            name: name.into(),
            status,
        });
    }

    pub fn status_of(&self, name: &str) -> Option<&AssetSyncStatus> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.status)
    }

    pub fn cached(&self) -> usize {
        self.count(|s| matches!(s, AssetSyncStatus::Cached))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, AssetSyncStatus::Downloaded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, AssetSyncStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&AssetSyncStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}
