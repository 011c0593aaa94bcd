//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, AppState};
use super::middleware::{create_cors_layer, ip_rate_limit, IpRateLimitState};

/// Create the main API router.
///
/// The multipart body limit is a multiple of the per-file ceiling so that a
/// single oversized file in a batch still reaches the per-file size check
/// (and its independent error) instead of killing the whole request.
pub fn create_router(
    app_state: Arc<AppState>,
    ip_limit: Arc<IpRateLimitState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = (app_state.max_upload_size as usize)
        .saturating_mul(4)
        .saturating_add(10 * 1024 * 1024);

    let file_routes = Router::new()
        .route("/files", get(handlers::list_files))
        .route("/files/upload", post(handlers::upload_files))
        .route(
            "/files/:id",
            get(handlers::get_file)
                .put(handlers::update_file)
                .patch(handlers::update_file)
                .delete(handlers::delete_file),
        )
        .route("/files/:id/download", get(handlers::download_file))
        .route("/files/:id/thumbnail", get(handlers::thumbnail_file));

    let folder_routes = Router::new()
        .route(
            "/folders",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route("/folders/tree", get(handlers::folder_tree))
        .route(
            "/folders/:id",
            get(handlers::get_folder)
                .put(handlers::update_folder)
                .patch(handlers::update_folder)
                .delete(handlers::delete_folder),
        );

    let key_routes = Router::new()
        .route("/keys", get(handlers::list_keys).post(handlers::create_key))
        .route("/keys/stats", get(handlers::key_stats))
        .route(
            "/keys/:id",
            get(handlers::get_key)
                .put(handlers::update_key)
                .delete(handlers::delete_key),
        );

    let api_routes = Router::new()
        .merge(file_routes)
        .merge(folder_routes)
        .merge(key_routes);

    let ip_limit_for_middleware = ip_limit.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = ip_limit_for_middleware.clone();
                    ip_rate_limit(state, req, next)
                })),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// OpenAPI document for the service.
#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::files::list_files,
        super::handlers::files::upload_files,
        super::handlers::files::get_file,
        super::handlers::files::update_file,
        super::handlers::files::delete_file,
        super::handlers::files::download_file,
        super::handlers::files::thumbnail_file,
        super::handlers::folders::list_folders,
        super::handlers::folders::folder_tree,
        super::handlers::folders::create_folder,
        super::handlers::folders::get_folder,
        super::handlers::folders::update_folder,
        super::handlers::folders::delete_folder,
        super::handlers::keys::list_keys,
        super::handlers::keys::create_key,
        super::handlers::keys::key_stats,
        super::handlers::keys::get_key,
        super::handlers::keys::update_key,
        super::handlers::keys::delete_key,
    ),
    components(schemas(
        crate::web::dto::FileResponse,
        crate::web::dto::FileListResponse,
        crate::web::dto::PaginationMeta,
        crate::web::dto::UploadResponse,
        crate::web::dto::UploadFailure,
        crate::web::dto::UpdateFileRequest,
        crate::web::dto::FolderResponse,
        crate::web::dto::FolderTreeResponse,
        crate::web::dto::FolderCounts,
        crate::web::dto::CreateFolderRequest,
        crate::web::dto::UpdateFolderRequest,
        crate::web::dto::ApiKeyResponse,
        crate::web::dto::CreateKeyRequest,
        crate::web::dto::CreateKeyResponse,
        crate::web::dto::UpdateKeyRequest,
        crate::web::dto::KeyStatsResponse,
        crate::web::dto::SuccessResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "File upload, listing, and retrieval"),
        (name = "folders", description = "Folder hierarchy"),
        (name = "keys", description = "API key management")
    )
)]
struct ApiDoc;

/// Registers the X-API-Key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

/// Create the swagger UI router.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
