use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use mirror_engine::InboundNotification;
use mirror_engine::check_update as compare_versions;
use mirror_engine::notify::{EVENT_HEADER, SIGNATURE_HEADER};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

use super::AppState;
use super::error::ApiError;
use super::models::{
    CheckUpdateQuery, ErrorResponse, ServiceInfo, UpdateCheckResponse, VersionInfo,
    WebhookResponse,
};

pub const APP_NAME: &str = "release-mirror";

/// Service name and version
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        app: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full descriptor of the latest release
#[utoipa::path(
    get,
    path = "/api/v1/version",
    tag = "update",
    responses(
        (status = 200, description = "Latest release", body = VersionInfo),
        (status = 503, description = "No release fetched yet", body = ErrorResponse)
    )
)]
pub async fn version(State(state): State<AppState>) -> Result<Json<VersionInfo>, ApiError> {
    let release = state.versions.current().ok_or_else(ApiError::version_unavailable)?;
    Ok(Json(VersionInfo::from_release(&release, &state.base_url)))
}

/// Check whether a client version is behind the latest release
#[utoipa::path(
    get,
    path = "/api/v1/check-update",
    tag = "update",
    params(CheckUpdateQuery),
    responses(
        (status = 200, description = "Update check result", body = UpdateCheckResponse),
        (status = 400, description = "Missing version parameter", body = ErrorResponse),
        (status = 503, description = "No release fetched yet", body = ErrorResponse)
    )
)]
pub async fn check_update(
    State(state): State<AppState>,
    query: Result<Query<CheckUpdateQuery>, QueryRejection>,
) -> Result<Json<UpdateCheckResponse>, ApiError> {
    let Query(query) = query?;
    let client_version = query
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing version parameter".to_string()))?;

    let release = state.versions.current().ok_or_else(ApiError::version_unavailable)?;
    let check = compare_versions(client_version, &release, &state.base_url);
    debug!(
        client_version,
        latest = %check.latest_version,
        update_available = check.update_available,
        "Update check"
    );
    Ok(Json(check.into()))
}

/// Download one asset of a release, from cache or fetched on demand
#[utoipa::path(
    get,
    path = "/api/v1/download/{tag}/{asset}",
    tag = "download",
    params(
        ("tag" = String, Path, description = "Release tag", example = "v1.0.0"),
        ("asset" = String, Path, description = "Asset file name", example = "app-linux-amd64.tar.gz")
    ),
    responses(
        (status = 200, description = "Asset bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid path", body = ErrorResponse),
        (status = 404, description = "Unknown version or file", body = ErrorResponse),
        (status = 500, description = "Upstream download failed", body = ErrorResponse)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let Path((tag, asset)) = path?;
    let served = state.downloads.resolve(&tag, &asset).await?;

    let response = match ServeFile::new(&served.path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    match HeaderValue::from_str(&format!("attachment; filename={}", served.file_name)) {
        Ok(value) => {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!(file = %served.file_name, error = %e, "File name is not a valid header value"),
    }
    Ok(response)
}

/// Release webhook receiver
#[utoipa::path(
    post,
    path = "/api/v1/webhook",
    tag = "webhook",
    request_body(content = String, description = "Release event payload", content_type = "application/json"),
    params(
        ("X-GitHub-Event" = String, Header, description = "Event type, only `release` triggers a refresh"),
        ("X-Hub-Signature-256" = Option<String>, Header, description = "`sha256=<hex>` HMAC of the body")
    ),
    responses(
        (status = 200, description = "Webhook handled", body = WebhookResponse),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 401, description = "Invalid signature", body = ErrorResponse),
        (status = 405, description = "Method not allowed", body = ErrorResponse)
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let body = body?;
    let outcome = state.ingester.ingest(InboundNotification {
        method: &method,
        event: header_str(&headers, EVENT_HEADER),
        signature: header_str(&headers, SIGNATURE_HEADER),
        body: &body,
    })?;
    info!(outcome = ?outcome, "Webhook handled");
    Ok(Json(outcome.into()))
}

/// Proxy the `domains.json` document of the configured repository
#[utoipa::path(
    get,
    path = "/api/v1/redirect/domains",
    tag = "redirect",
    responses(
        (status = 200, description = "The domains document, verbatim", content_type = "application/json"),
        (status = 500, description = "Not configured or undecodable", body = ErrorResponse),
        (status = 502, description = "Upstream unreachable", body = ErrorResponse)
    )
)]
pub async fn domains(State(state): State<AppState>) -> Result<Response, ApiError> {
    let document = state.domains.fetch().await?;
    Ok(([(CONTENT_TYPE, "application/json")], document).into_response())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("not found".to_string())
}
