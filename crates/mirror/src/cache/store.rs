//! # Cache Store
//!
//! Download-on-miss storage for release assets.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use crate::MirrorConfig;
use crate::cache::types::{AssetSyncStatus, CacheKey, EnsureStatus, SyncReport};
use crate::cache::utils::temp_path_for;
use crate::error::CacheError;
use crate::release::ReleaseDescriptor;

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    client: Client,
    download_timeout: Duration,
    buffer_size: usize,
}

impl CacheStore {
    pub fn new(client: Client, config: &MirrorConfig) -> Self {
        Self {
            root: config.cache_root.clone(),
            client,
            download_timeout: config.download_timeout,
            buffer_size: config.buffer_size.max(1),
        }
    }

    /// Create the cache root. Failing here is fatal for the server.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of an entry.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// A committed file exists at the entry's path.
    pub async fn is_committed(&self, key: &CacheKey) -> bool {
        matches!(fs::metadata(self.path_for(key)).await, Ok(meta) if meta.is_file())
    }

    /// A committed file exists and its length matches the declared size.
    pub async fn is_valid(&self, key: &CacheKey, size_bytes: u64) -> bool {
        matches!(
            fs::metadata(self.path_for(key)).await,
            Ok(meta) if meta.is_file() && meta.len() == size_bytes
        )
    }

    /// Return the path of a valid copy of `key`, downloading it first when
    /// it is absent or its size does not match.
    pub async fn ensure(
        &self,
        key: &CacheKey,
        size_bytes: u64,
        source_url: &str,
        auth_token: Option<&str>,
    ) -> Result<PathBuf, CacheError> {
        self.ensure_with_status(key, size_bytes, source_url, auth_token)
            .await
            .map(|(path, _)| path)
    }

    pub async fn ensure_with_status(
        &self,
        key: &CacheKey,
        size_bytes: u64,
        source_url: &str,
        auth_token: Option<&str>,
    ) -> Result<(PathBuf, EnsureStatus), CacheError> {
        let dest = self.path_for(key);
        if self.is_valid(key, size_bytes).await {
            debug!(key = %key, "Cache hit");
            return Ok((dest, EnsureStatus::Cached));
        }

        info!(
            key = %key,
            size_mb = size_bytes / 1024 / 1024,
            "Downloading asset"
        );
        self.download(key, &dest, size_bytes, source_url, auth_token)
            .await?;
        info!(key = %key, "Asset cached");

        Ok((dest, EnsureStatus::Downloaded))
    }

    /// Ensure every asset of `release`; failures are recorded, never fatal to the batch.
    pub async fn sync_all(
        &self,
        release: &ReleaseDescriptor,
        auth_token: Option<&str>,
    ) -> SyncReport {
        info!(
            tag = %release.tag,
            assets = release.assets.len(),
            "Starting release sync"
        );

        let mut report = SyncReport::new(&release.tag);
        for asset in &release.assets {
            let status = match CacheKey::new(&release.tag, &asset.name) {
                Ok(key) => match self
                    .ensure_with_status(&key, asset.size_bytes, &asset.source_url, auth_token)
                    .await
                {
                    Ok((_, EnsureStatus::Cached)) => {
                        info!(key = %key, "Skipping asset, already cached");
                        AssetSyncStatus::Cached
                    }
                    Ok((_, EnsureStatus::Downloaded)) => AssetSyncStatus::Downloaded,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Asset download failed");
                        AssetSyncStatus::Failed(e.to_string())
                    }
                },
                Err(e) => {
                    warn!(tag = %release.tag, asset = %asset.name, error = %e, "Refusing to cache asset");
                    AssetSyncStatus::Failed(e.to_string())
                }
            };
            report.push(asset.name.clone(), status);
        }

        info!(
            tag = %release.tag,
            cached = report.cached(),
            downloaded = report.downloaded(),
            failed = report.failed(),
            "Release sync finished"
        );
        report
    }

    async fn download(
        &self,
        key: &CacheKey,
        dest: &Path,
        size_bytes: u64,
        source_url: &str,
        auth_token: Option<&str>,
    ) -> Result<(), CacheError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::download_failed(key, e))?;
        }

        let temp_path = temp_path_for(dest);
        let result = match self
            .write_temp(key, &temp_path, size_bytes, source_url, auth_token)
            .await
        {
            Ok(()) => fs::rename(&temp_path, dest)
                .await
                .map_err(|e| CacheError::download_failed(key, e)),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = ?temp_path, error = %e, "Failed to remove temporary file");
                }
            }
        }
        result
    }

    async fn write_temp(
        &self,
        key: &CacheKey,
        temp_path: &Path,
        size_bytes: u64,
        source_url: &str,
        auth_token: Option<&str>,
    ) -> Result<(), CacheError> {
        let mut request = self
            .client
            .get(source_url)
            .timeout(self.download_timeout);
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CacheError::download_failed(key, e))?;
        if response.status() != StatusCode::OK {
            return Err(CacheError::download_failed(
                key,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = StreamReader::new(Box::pin(
            response.bytes_stream().map_err(io::Error::other),
        ));
        let mut reader = BufReader::with_capacity(self.buffer_size, body);

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| CacheError::download_failed(key, e))?;
        let written = tokio::io::copy_buf(&mut reader, &mut file)
            .await
            .map_err(|e| CacheError::download_failed(key, e))?;
        file.flush()
            .await
            .map_err(|e| CacheError::download_failed(key, e))?;
        file.sync_all()
            .await
            .map_err(|e| CacheError::download_failed(key, e))?;
        drop(file);

        if written != size_bytes {
            return Err(CacheError::download_failed(
                key,
                format!("size mismatch: expected {size_bytes} bytes, received {written}"),
            ));
        }

        debug!(key = %key, bytes = written, "Download written to temporary file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::create_client;
    use crate::release::Asset;
    use crate::test_support::{FakeUpstream, TestAsset};

    fn store_at(root: &Path) -> CacheStore {
        let config = MirrorConfig {
            cache_root: root.to_path_buf(),
            ..MirrorConfig::default()
        };
        CacheStore::new(create_client(&config).unwrap(), &config)
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| p.to_string_lossy().ends_with(crate::cache::TEMP_SUFFIX))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn ensure_downloads_then_hits_cache() {
        let body = payload(100 * 1024);
        let upstream = FakeUpstream::start("v1.0.0", vec![TestAsset::new("app.zip", &body)]).await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        let key = CacheKey::new("v1.0.0", "app.zip").unwrap();
        let url = upstream.asset_url("v1.0.0", "app.zip");

        let (path, status) = store
            .ensure_with_status(&key, body.len() as u64, &url, Some("secret"))
            .await
            .unwrap();
        assert_eq!(status, EnsureStatus::Downloaded);
        assert_eq!(path, dir.path().join("v1.0.0").join("app.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert!(temp_files(&dir.path().join("v1.0.0")).is_empty());
        assert_eq!(upstream.last_authorization().as_deref(), Some("token secret"));

        let (_, status) = store
            .ensure_with_status(&key, body.len() as u64, &url, None)
            .await
            .unwrap();
        assert_eq!(status, EnsureStatus::Cached);
        assert_eq!(upstream.asset_hits(), 1);
    }

    #[tokio::test]
    async fn size_mismatch_triggers_refetch() {
        let body = payload(4096);
        let upstream = FakeUpstream::start("v1", vec![TestAsset::new("app.zip", &body)]).await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        let key = CacheKey::new("v1", "app.zip").unwrap();

        std::fs::create_dir_all(dir.path().join("v1")).unwrap();
        std::fs::write(dir.path().join("v1").join("app.zip"), b"stale").unwrap();

        let path = store
            .ensure(&key, body.len() as u64, &upstream.asset_url("v1", "app.zip"), None)
            .await
            .unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), body.len() as u64);
        assert_eq!(upstream.asset_hits(), 1);
    }

    #[tokio::test]
    async fn failed_download_leaves_no_artifacts() {
        let upstream = FakeUpstream::start(
            "v1",
            vec![TestAsset::new("broken.zip", b"nope").failing(reqwest::StatusCode::INTERNAL_SERVER_ERROR)],
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        let key = CacheKey::new("v1", "broken.zip").unwrap();

        let err = store
            .ensure(&key, 4, &upstream.asset_url("v1", "broken.zip"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::DownloadFailed { .. }));
        assert!(!store.path_for(&key).exists());
        assert!(temp_files(&dir.path().join("v1")).is_empty());
    }

    #[tokio::test]
    async fn short_body_is_not_committed() {
        let upstream = FakeUpstream::start(
            "v1",
            vec![TestAsset::new("app.zip", b"only-part").with_declared_size(1024)],
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        let key = CacheKey::new("v1", "app.zip").unwrap();

        let err = store
            .ensure(&key, 1024, &upstream.asset_url("v1", "app.zip"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("size mismatch"), "{err}");
        assert!(!store.path_for(&key).exists());
        assert!(temp_files(&dir.path().join("v1")).is_empty());
    }

    #[tokio::test]
    async fn unreachable_source_is_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        let key = CacheKey::new("v1", "app.zip").unwrap();

        let err = store
            .ensure(&key, 10, "http://127.0.0.1:1/app.zip", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::DownloadFailed { .. }));
        assert!(temp_files(&dir.path().join("v1")).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ensure_converges_on_complete_file() {
        let body = payload(512 * 1024);
        let upstream = FakeUpstream::start("v1", vec![TestAsset::new("big.bin", &body)]).await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_at(dir.path()));
        let key = CacheKey::new("v1", "big.bin").unwrap();
        let url = upstream.asset_url("v1", "big.bin");
        let final_path = store.path_for(&key);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let key = key.clone();
            let url = url.clone();
            let size = body.len() as u64;
            tasks.push(tokio::spawn(async move {
                store.ensure(&key, size, &url, None).await
            }));
        }

        // Sample the final path while writers race: it is either absent or complete.
        for _ in 0..50 {
            if let Ok(bytes) = std::fs::read(&final_path) {
                assert_eq!(bytes.len(), body.len());
            }
            tokio::task::yield_now().await;
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), final_path);
        }
        assert_eq!(std::fs::read(&final_path).unwrap(), body);
        assert!(temp_files(&dir.path().join("v1")).is_empty());
    }

    #[tokio::test]
    async fn sync_all_records_per_asset_status() {
        let good = payload(2048);
        let upstream = FakeUpstream::start(
            "v2",
            vec![
                TestAsset::new("good.zip", &good),
                TestAsset::new("cached.zip", b"cached"),
                TestAsset::new("bad.zip", b"x").failing(reqwest::StatusCode::NOT_FOUND),
            ],
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());

        std::fs::create_dir_all(dir.path().join("v2")).unwrap();
        std::fs::write(dir.path().join("v2").join("cached.zip"), b"cached").unwrap();

        let asset = |name: &str, size: u64| Asset {
            name: name.to_owned(),
            size_bytes: size,
            source_url: upstream.asset_url("v2", name),
        };
        let release = ReleaseDescriptor {
            tag: "v2".to_owned(),
            notes: String::new(),
            published_at: String::new(),
            assets: vec![
                asset("good.zip", good.len() as u64),
                asset("cached.zip", 6),
                asset("bad.zip", 1),
                asset("../escape.zip", 1),
            ],
        };

        let report = store.sync_all(&release, None).await;
        assert_eq!(report.tag, "v2");
        assert_eq!(report.status_of("good.zip"), Some(&AssetSyncStatus::Downloaded));
        assert_eq!(report.status_of("cached.zip"), Some(&AssetSyncStatus::Cached));
        assert!(matches!(report.status_of("bad.zip"), Some(AssetSyncStatus::Failed(_))));
        assert!(matches!(
            report.status_of("../escape.zip"),
            Some(AssetSyncStatus::Failed(_))
        ));
        assert_eq!(report.failed(), 2);
        assert!(!dir.path().join("escape.zip").exists());
    }
}
