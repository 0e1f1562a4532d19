//! Request and response bodies of the HTTP API.

use mirror_engine::{IngestOutcome, ReleaseDescriptor, UpdateCheck};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    #[schema(example = "release-mirror")]
    pub app: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetInfo {
    #[schema(example = "app-linux-amd64.tar.gz")]
    pub name: String,
    pub size: u64,
    /// Link served by this mirror, not the upstream URL
    #[schema(example = "https://updates.example.com/api/v1/download/v1.2.0/app-linux-amd64.tar.gz")]
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VersionInfo {
    #[schema(example = "v1.2.0")]
    pub version: String,
    pub release_notes: String,
    pub published_at: String,
    pub assets: Vec<AssetInfo>,
}

impl VersionInfo {
    pub fn from_release(release: &ReleaseDescriptor, base_url: &str) -> Self {
        let assets = release
            .assets
            .iter()
            .map(|asset| AssetInfo {
                name: asset.name.clone(),
                size: asset.size_bytes,
                download_url: format!(
                    "{base_url}/api/v1/download/{}/{}",
                    release.tag, asset.name
                ),
            })
            .collect();

        Self {
            version: release.tag.clone(),
            release_notes: release.notes.clone(),
            published_at: release.published_at.clone(),
            assets,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckUpdateQuery {
    /// Version the client is currently running
    #[param(example = "v1.0.0")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateCheckResponse {
    pub update_available: bool,
    #[schema(example = "v1.2.0")]
    pub latest_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_notes: String,
    #[schema(example = "https://updates.example.com")]
    pub download_url: String,
}

impl From<UpdateCheck> for UpdateCheckResponse {
    fn from(check: UpdateCheck) -> Self {
        Self {
            update_available: check.update_available,
            latest_version: check.latest_version,
            release_notes: check.release_notes,
            download_url: check.download_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    /// `ok`, `ignored` or `skipped`
    #[schema(example = "ok")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<IngestOutcome> for WebhookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Accepted { tag } => Self {
                status: "ok".to_string(),
                version: Some(tag),
                reason: None,
            },
            IngestOutcome::Ignored { reason } => Self {
                status: "ignored".to_string(),
                version: None,
                reason: Some(reason),
            },
            IngestOutcome::Skipped { reason } => Self {
                status: "skipped".to_string(),
                version: None,
                reason: Some(reason),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "version information unavailable")]
    pub error: String,
}
