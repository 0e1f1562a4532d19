//! # Release Source
//!
//! Stateless client for the upstream "latest release" endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::MirrorConfig;
use crate::error::FetchError;
use crate::release::{RawRelease, ReleaseDescriptor};

/// Anything that can produce the current upstream release.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<ReleaseDescriptor, FetchError>;
}

/// Fetches `{api_url}/repos/{repo}/releases/latest` from a GitHub-compatible API.
#[derive(Debug, Clone)]
pub struct GithubReleaseSource {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl GithubReleaseSource {
    pub fn new(client: Client, config: &MirrorConfig) -> Self {
        Self {
            client,
            endpoint: config.latest_release_url(),
            token: config.token().map(str::to_owned),
            timeout: config.metadata_timeout,
        }
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    async fn fetch_latest(&self) -> Result<ReleaseDescriptor, FetchError> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| FetchError::Url(format!("{}: {e}", self.endpoint)))?;

        let mut request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github.v3+json"),
            );
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let raw: RawRelease = serde_json::from_slice(&bytes)?;
        let release = ReleaseDescriptor::from(raw);
        debug!(
            tag = %release.tag,
            assets = release.assets.len(),
            "Fetched latest release"
        );
        Ok(release)
    }
}
