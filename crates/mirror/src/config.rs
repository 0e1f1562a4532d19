use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("release-mirror/", env!("CARGO_PKG_VERSION"));

/// Default upstream API root, matching the public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Size of the intermediate buffer used when streaming an asset to disk.
pub const DOWNLOAD_BUFFER_SIZE: usize = 32 * 1024;

/// Configurable options for the mirror engine
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root directory of the on-disk asset cache
    pub cache_root: PathBuf,

    /// Base URL of the release metadata API
    pub api_url: String,

    /// Repository identifier in `owner/name` form
    pub repo: String,

    /// Access token sent with metadata and asset requests
    pub token: Option<String>,

    /// Timeout for release metadata requests
    pub metadata_timeout: Duration,

    /// Timeout for a single asset transfer
    pub download_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Buffer size used while streaming downloads to disk
    pub buffer_size: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("github_cache"),
            api_url: DEFAULT_API_URL.to_owned(),
            repo: String::new(),
            token: None,
            metadata_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(30 * 60),
            connect_timeout: Duration::from_secs(10),
            buffer_size: DOWNLOAD_BUFFER_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl MirrorConfig {
    /// Endpoint returning the latest release of the configured repository.
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            self.repo
        )
    }

    /// Access token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
