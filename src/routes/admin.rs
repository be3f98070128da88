use crate::{AppState, admin_auth_middleware, controller::CrudController, handlers};
use axum::{
    Router, middleware,
    routing::{post, put},
};

/// Admin Router Module
///
/// Everything the admin panel writes through:
/// - `POST <base>`, `PUT|PATCH|DELETE <base>/{id}` per content type
/// - `PUT  /api/content/{page}` page documents
/// - `POST /api/admin/uploads/presigned` media uploads
///
/// Content routes run behind `admin_auth_middleware`; the page and upload
/// handlers take the `AdminUser` extractor directly.
pub fn admin_routes(state: &AppState, controllers: &[CrudController]) -> Router<AppState> {
    let router = Router::new()
        .route("/api/content/{page}", put(handlers::put_page))
        .route(
            "/api/admin/uploads/presigned",
            post(handlers::create_presigned_upload),
        );

    controllers.iter().fold(router, |router, controller| {
        router.merge(
            content_write_routes(controller).route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_auth_middleware,
            )),
        )
    })
}

/// Write routes of one content type, with its controller as state.
fn content_write_routes(controller: &CrudController) -> Router<AppState> {
    let base = controller.config().base_path;

    Router::new()
        .route(base, post(handlers::create_document))
        .route(
            &format!("{base}/{{id}}"),
            put(handlers::update_document)
                .patch(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .with_state(controller.clone())
}
