//! # Release model
//!
//! The descriptor of one published release and the wire format it is decoded from.

use serde::{Deserialize, Serialize};

/// One named downloadable file belonging to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub size_bytes: u64,
    pub source_url: String,
}

/// The authoritative upstream state for one release.
///
/// Built wholesale from a fetch and never mutated afterwards; a newer fetch
/// supersedes it as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub tag: String,
    pub notes: String,
    pub published_at: String,
    pub assets: Vec<Asset>,
}

impl ReleaseDescriptor {
    /// Look up an asset by name.
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

// Upstream payload, shaped like the GitHub "latest release" response.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    assets: Vec<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

impl From<RawRelease> for ReleaseDescriptor {
    fn from(raw: RawRelease) -> Self {
        let mut assets: Vec<Asset> = Vec::with_capacity(raw.assets.len());
        for a in raw.assets {
            // names are unique within a release; keep the first occurrence
            if assets.iter().any(|existing| existing.name == a.name) {
                continue;
            }
            assets.push(Asset {
                name: a.name,
                size_bytes: a.size,
                source_url: a.browser_download_url,
            });
        }

        Self {
            tag: raw.tag_name,
            notes: raw.body.unwrap_or_default(),
            published_at: raw.published_at.unwrap_or_default(),
            assets,
        }
    }
}
