use crate::{AppState, controller::CrudController, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints the site renderer reads from:
/// - `GET  /health`
/// - `GET  <base>`, `GET <base>/{id}`, `GET <base>/slug/{slug}` per content type
/// - `POST <base>/{id}/views` view counter
/// - `GET  /api/content`, `GET /api/content/{page}` JSON page documents
pub fn public_routes(controllers: &[CrudController]) -> Router<AppState> {
    let router = Router::new()
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .route("/api/content", get(handlers::list_pages))
        .route("/api/content/{page}", get(handlers::get_page));

    controllers
        .iter()
        .fold(router, |router, controller| router.merge(content_read_routes(controller)))
}

/// Read routes of one content type, with its controller as state.
fn content_read_routes(controller: &CrudController) -> Router<AppState> {
    let config = controller.config();
    let base = config.base_path;

    let mut router = Router::new()
        .route(base, get(handlers::list_documents))
        .route(&format!("{base}/{{id}}"), get(handlers::get_document));

    if config.slug_field.is_some() {
        router = router.route(
            &format!("{base}/slug/{{slug}}"),
            get(handlers::get_document_by_slug),
        );
    }
    if config.counter_field.is_some() {
        router = router.route(&format!("{base}/{{id}}/views"), post(handlers::record_view));
    }

    router.with_state(controller.clone())
}
