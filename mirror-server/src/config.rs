use anyhow::{Context, Result, bail, ensure};
use mirror_engine::MirrorConfig;
use mirror_engine::config::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,

    /// Repository whose releases are mirrored
    pub release: ReleaseConfig,

    /// Repository holding `domains.json`
    pub domains: DomainsConfig,

    pub cache: CacheConfig,

    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Public URL prefix used to build download links
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// `owner/name`
    pub repo: String,

    /// Access token, required for private repositories
    pub token: String,

    /// Shared secret for webhook signatures; empty disables verification
    pub webhook_secret: String,

    pub api_url: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            token: String::new(),
            webhook_secret: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainsConfig {
    pub repo: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("github_cache"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Period of the background refresh
    pub interval_secs: u64,

    pub metadata_timeout_secs: u64,

    pub download_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            metadata_timeout_secs: 30,
            download_timeout_secs: 30 * 60,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl AppConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).context("Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.release.repo.trim().is_empty() {
            bail!("release.repo must be set");
        }
        ensure!(
            self.release.repo.split('/').filter(|p| !p.is_empty()).count() == 2,
            "release.repo must be in owner/name form, got {:?}",
            self.release.repo
        );
        ensure!(
            self.refresh.interval_secs > 0,
            "refresh.interval_secs must be greater than zero"
        );
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn release_token(&self) -> Option<String> {
        non_empty(&self.release.token)
    }

    pub fn webhook_secret(&self) -> Option<String> {
        non_empty(&self.release.webhook_secret)
    }

    pub fn domains_token(&self) -> Option<String> {
        non_empty(&self.domains.token)
    }

    /// Public prefix for download links, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }

    /// Engine settings derived from this configuration
    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            cache_root: self.cache.dir.clone(),
            api_url: self.release.api_url.clone(),
            repo: self.release.repo.trim().to_string(),
            token: self.release_token(),
            metadata_timeout: Duration::from_secs(self.refresh.metadata_timeout_secs),
            download_timeout: Duration::from_secs(self.refresh.download_timeout_secs),
            ..MirrorConfig::default()
        }
    }
}
