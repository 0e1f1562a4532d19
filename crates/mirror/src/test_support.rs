//! Shared test doubles: an in-process upstream release feed served by axum
//! and an in-memory [`ReleaseSource`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::FetchError;
use crate::release::{Asset, ReleaseDescriptor};
use crate::source::ReleaseSource;

pub(crate) const REPO: &str = "acme/app";

/// Lightweight HTTP test server bound to a random localhost port.
pub(crate) struct TestHttpServer {
    base_url: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHttpServer {
    /// Bind first, then build the router so handlers can embed absolute URLs.
    pub(crate) async fn start(build: impl FnOnce(&str) -> Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test HTTP listener");
        let addr = listener
            .local_addr()
            .expect("read test listener local addr");
        let base_url = format!("http://{addr}");
        let router = build(&base_url);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.expect("run test HTTP server");
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TestAsset {
    pub name: String,
    pub body: Vec<u8>,
    pub declared_size: u64,
    pub status: StatusCode,
    pub delay: Option<Duration>,
}

impl TestAsset {
    pub(crate) fn new(name: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            body: body.to_vec(),
            declared_size: body.len() as u64,
            status: StatusCode::OK,
            delay: None,
        }
    }

    pub(crate) fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    pub(crate) fn failing(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Hold the response back for `delay` before sending it.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct UpstreamState {
    tag: String,
    notes: String,
    assets: Vec<TestAsset>,
    release_status: StatusCode,
    last_authorization: Option<String>,
}

#[derive(Clone)]
struct Shared {
    base_url: String,
    state: Arc<Mutex<UpstreamState>>,
    release_hits: Arc<AtomicUsize>,
    asset_hits: Arc<AtomicUsize>,
}

/// A fake release feed exposing `/repos/acme/app/releases/latest` and `/assets/{tag}/{name}`.
pub(crate) struct FakeUpstream {
    pub server: TestHttpServer,
    shared: Shared,
}

impl FakeUpstream {
    pub(crate) async fn start(tag: &str, assets: Vec<TestAsset>) -> Self {
        let state = Arc::new(Mutex::new(UpstreamState {
            tag: tag.to_owned(),
            notes: format!("notes for {tag}"),
            assets,
            release_status: StatusCode::OK,
            last_authorization: None,
        }));
        let release_hits = Arc::new(AtomicUsize::new(0));
        let asset_hits = Arc::new(AtomicUsize::new(0));

        let mut shared = None;
        let server = TestHttpServer::start(|base_url| {
            let s = Shared {
                base_url: base_url.to_owned(),
                state: state.clone(),
                release_hits: release_hits.clone(),
                asset_hits: asset_hits.clone(),
            };
            shared = Some(s.clone());
            Router::new()
                .route(&format!("/repos/{REPO}/releases/latest"), get(latest_release))
                .route("/assets/{tag}/{name}", get(asset_body))
                .with_state(s)
        })
        .await;

        Self {
            server,
            shared: shared.expect("router built"),
        }
    }

    pub(crate) fn api_url(&self) -> &str {
        self.server.base_url()
    }

    pub(crate) fn asset_url(&self, tag: &str, name: &str) -> String {
        self.server.url(&format!("/assets/{tag}/{name}"))
    }

    pub(crate) fn publish(&self, tag: &str, assets: Vec<TestAsset>) {
        let mut state = self.shared.state.lock();
        state.tag = tag.to_owned();
        state.notes = format!("notes for {tag}");
        state.assets = assets;
    }

    pub(crate) fn set_release_status(&self, status: StatusCode) {
        self.shared.state.lock().release_status = status;
    }

    pub(crate) fn release_hits(&self) -> usize {
        self.shared.release_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn asset_hits(&self) -> usize {
        self.shared.asset_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.shared.state.lock().last_authorization.clone()
    }
}

async fn latest_release(State(s): State<Shared>, headers: HeaderMap) -> Response {
    s.release_hits.fetch_add(1, Ordering::SeqCst);
    let mut state = s.state.lock();
    state.last_authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if state.release_status != StatusCode::OK {
        return (state.release_status, "upstream unavailable").into_response();
    }

    let assets: Vec<_> = state
        .assets
        .iter()
        .map(|a| {
            json!({
                "name": a.name,
                "size": a.declared_size,
                "browser_download_url": format!("{}/assets/{}/{}", s.base_url, state.tag, a.name),
            })
        })
        .collect();

    axum::Json(json!({
        "tag_name": state.tag,
        "name": state.tag,
        "body": state.notes,
        "published_at": "2024-01-01T00:00:00Z",
        "assets": assets,
    }))
    .into_response()
}

async fn asset_body(
    State(s): State<Shared>,
    Path((_tag, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    s.asset_hits.fetch_add(1, Ordering::SeqCst);
    let (response, delay) = {
        let mut state = s.state.lock();
        state.last_authorization = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match state.assets.iter().find(|a| a.name == name) {
            Some(a) if a.status == StatusCode::OK => (a.body.clone().into_response(), a.delay),
            Some(a) => (a.status.into_response(), a.delay),
            None => (StatusCode::NOT_FOUND.into_response(), None),
        }
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

/// An in-memory release source; no network involved, safe under a paused clock.
pub(crate) struct StaticSource {
    release: Mutex<Option<ReleaseDescriptor>>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(release: Option<ReleaseDescriptor>) -> Self {
        Self {
            release: Mutex::new(release),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set(&self, release: Option<ReleaseDescriptor>) {
        *self.release.lock() = release;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseSource for StaticSource {
    async fn fetch_latest(&self) -> Result<ReleaseDescriptor, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.lock().clone().ok_or_else(|| FetchError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "no release".to_owned(),
        })
    }
}

/// A release with no assets, so a sync performs no I/O.
pub(crate) fn empty_release(tag: &str) -> ReleaseDescriptor {
    ReleaseDescriptor {
        tag: tag.to_owned(),
        notes: String::new(),
        published_at: String::new(),
        assets: Vec::<Asset>::new(),
    }
}
