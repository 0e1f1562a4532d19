//! # Domains
//!
//! Fetches a `domains.json` document from a (usually private) repository via
//! the contents API and returns the decoded file verbatim.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

const DOMAINS_FILE: &str = "domains.json";

#[derive(Debug, thiserror::Error)]
pub enum DomainsError {
    #[error("domains repository is not configured")]
    NotConfigured,

    #[error("failed to reach upstream: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("upstream returned an error: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("failed to decode domains document: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DomainsClient {
    client: Client,
    url: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl DomainsClient {
    /// `repo` empty means the feature is disabled; requests then fail with
    /// [`DomainsError::NotConfigured`].
    pub fn new(
        client: Client,
        api_url: &str,
        repo: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let url = (!repo.is_empty()).then(|| {
            format!(
                "{}/repos/{}/contents/{DOMAINS_FILE}",
                api_url.trim_end_matches('/'),
                repo
            )
        });
        Self {
            client,
            url,
            token: token.filter(|t| !t.is_empty()),
            timeout,
        }
    }

    pub async fn fetch(&self) -> Result<Bytes, DomainsError> {
        let url = self.url.as_deref().ok_or(DomainsError::NotConfigured)?;

        let mut request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(ACCEPT, HeaderValue::from_static("application/vnd.github+json"))
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| {
            warn!(url, error = %e, "Failed to reach domains repository");
            DomainsError::Connect(e)
        })?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainsError::Upstream { status, body });
        }

        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| DomainsError::Decode(e.to_string()))?;
        if let Some(encoding) = contents.encoding.as_deref() {
            if encoding != "base64" {
                return Err(DomainsError::Decode(format!(
                    "unsupported encoding {encoding}"
                )));
            }
        }

        // the contents API wraps base64 at 60 columns
        let cleaned: String = contents
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let decoded = STANDARD
            .decode(cleaned)
            .map_err(|e| DomainsError::Decode(e.to_string()))?;

        debug!(bytes = decoded.len(), "Fetched domains document");
        Ok(Bytes::from(decoded))
    }
}
