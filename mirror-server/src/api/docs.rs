use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppState;
use super::handlers;
use super::models::{
    AssetInfo, ErrorResponse, ServiceInfo, UpdateCheckResponse, VersionInfo, WebhookResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Release Mirror API",
        description = "Update checks, cached release downloads and release webhooks"
    ),
    paths(
        handlers::root,
        handlers::version,
        handlers::check_update,
        handlers::download,
        handlers::webhook,
        handlers::domains,
    ),
    components(schemas(
        ServiceInfo,
        VersionInfo,
        AssetInfo,
        UpdateCheckResponse,
        WebhookResponse,
        ErrorResponse,
    )),
    tags(
        (name = "system", description = "Service information"),
        (name = "update", description = "Release metadata and update checks"),
        (name = "download", description = "Asset downloads"),
        (name = "webhook", description = "Release notifications"),
        (name = "redirect", description = "Client redirect configuration"),
    )
)]
pub struct ApiDoc;

pub fn swagger_routes() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
