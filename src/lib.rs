use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod content_types;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod pages;
pub mod query;
pub mod repository;
pub mod response;
pub mod storage;
pub mod validation;

pub mod routes;
use auth::AdminUser;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use controller::CrudController;
pub use memory::MemoryRepository;
pub use pages::PageStore;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`. The content handlers are
/// generic, so their paths are documented with `{domain}/{resource}` segments.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_documents, handlers::get_document, handlers::get_document_by_slug,
        handlers::record_view, handlers::create_document, handlers::update_document,
        handlers::delete_document, handlers::list_pages, handlers::get_page,
        handlers::put_page, handlers::create_presigned_upload
    ),
    components(
        schemas(
            models::Article, models::CareerPosition, models::CareerDepartment,
            models::PortfolioProject, models::PortfolioCategory, models::ListMeta,
            models::PresignedUploadRequest, models::PresignedUploadResponse,
            error::FieldError,
        )
    ),
    tags(
        (name = "site-cms", description = "Site content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request. Sub-states are pulled out through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Document store behind every content type.
    pub repo: RepositoryState,
    /// Object storage for media uploads.
    pub storage: StorageState,
    /// JSON page documents.
    pub pages: PageStore,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for PageStore {
    fn from_ref(app_state: &AppState) -> PageStore {
        app_state.pages.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl AppState {
    /// One controller per content type, all sharing the same repository.
    pub fn controllers(&self) -> Vec<CrudController> {
        content_types::all()
            .into_iter()
            .map(|config| CrudController::new(self.repo.clone(), config))
            .collect()
    }
}

/// admin_auth_middleware
///
/// Resolving `AdminUser` is the whole check: a rejection short-circuits the
/// request with 401/403 before the handler runs.
pub async fn admin_auth_middleware(admin: AdminUser, request: Request, next: Next) -> Response {
    tracing::debug!(admin = %admin.subject, role = %admin.role, "admin request authorized");
    next.run(request).await
}

/// create_router
///
/// Assembles public and admin routes, then wraps them in the request-id,
/// tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let controllers = state.controllers();

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(&controllers))
        .merge(admin::admin_routes(&state, &controllers))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span for one request, correlated by the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
