//! # HTTP API
//!
//! Thin axum layer over the mirror engine. Handlers translate engine results
//! into JSON bodies; all state lives in [`AppState`].

pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{any, get};
use mirror_engine::{DomainsClient, DownloadService, NotificationIngester, VersionState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub versions: Arc<VersionState>,
    pub downloads: DownloadService,
    pub ingester: Arc<NotificationIngester>,
    pub domains: DomainsClient,
    /// Public prefix for download links, without a trailing slash
    pub base_url: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/v1/version", get(handlers::version))
        .route("/api/v1/check-update", get(handlers::check_update))
        .route("/api/v1/download/{tag}/{*asset}", get(handlers::download))
        // any method, so the ingester answers non-POST requests itself
        .route("/api/v1/webhook", any(handlers::webhook))
        .route("/api/v1/redirect/domains", get(handlers::domains))
        .merge(docs::swagger_routes())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
