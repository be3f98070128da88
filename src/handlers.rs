use crate::{
    auth::AdminUser,
    controller::{CrudController, Page},
    error::{ApiError, ApiResult},
    models::{ListMeta, PresignedUploadRequest, PresignedUploadResponse},
    pages::PageStore,
    repository::Document,
    response::{ApiResponse, WithStatus},
    storage::{StorageState, media_key},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, Uri},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use uuid::Uuid;

/// Unwraps a JSON body, turning axum's rejection into the envelope's 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn list_meta(page: &Page) -> ListMeta {
    ListMeta {
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
        filters: page.filters.clone(),
        search: page.search.clone(),
    }
}

// --- Generic content handlers ---
//
// Mounted once per content type with that type's `CrudController` as state.

/// list_documents
///
/// [Public] `GET /api/{domain}/{resource}?page=&limit=&q=&sort=&<filter>=`.
#[utoipa::path(
    get,
    path = "/api/{domain}/{resource}",
    params(
        ("domain" = String, Path, description = "blog | careers | portfolio"),
        ("resource" = String, Path, description = "articles | positions | departments | projects | categories"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, capped per content type"),
        ("q" = Option<String>, Query, description = "Free-text search"),
        ("sort" = Option<String>, Query, description = "field or -field"),
    ),
    responses(
        (status = 200, description = "Page of records; meta carries total and applied filters"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn list_documents(
    State(controller): State<CrudController>,
    uri: Uri,
) -> ApiResult<Json<ApiResponse<Vec<Document>>>> {
    // Filter keys are open-ended, so the query string is read as a plain map.
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let page = controller.list(&params).await?;
    let meta = serde_json::to_value(list_meta(&page)).unwrap_or(Value::Null);
    Ok(Json(ApiResponse::ok(page.items).with_meta(meta)))
}

/// get_document
///
/// [Public] `GET /api/{domain}/{resource}/{id}`.
#[utoipa::path(
    get,
    path = "/api/{domain}/{resource}/{id}",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
        ("id" = Uuid, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Record found"),
        (status = 404, description = "No record with this id")
    )
)]
pub async fn get_document(
    State(controller): State<CrudController>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Document>>> {
    let doc = controller.get(&id).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

/// get_document_by_slug
///
/// [Public] `GET /api/{domain}/{resource}/slug/{slug}` for slugged types.
#[utoipa::path(
    get,
    path = "/api/{domain}/{resource}/slug/{slug}",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
        ("slug" = String, Path, description = "URL slug"),
    ),
    responses(
        (status = 200, description = "Record found"),
        (status = 404, description = "No record with this slug")
    )
)]
pub async fn get_document_by_slug(
    State(controller): State<CrudController>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ApiResponse<Document>>> {
    let doc = controller.get_by_slug(&slug).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

/// record_view
///
/// [Public] `POST /api/{domain}/{resource}/{id}/views`. Atomic counter bump.
#[utoipa::path(
    post,
    path = "/api/{domain}/{resource}/{id}/views",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
        ("id" = Uuid, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Counter incremented"),
        (status = 404, description = "Unknown record or type without a counter")
    )
)]
pub async fn record_view(
    State(controller): State<CrudController>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Document>>> {
    let doc = controller.record_view(&id).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

/// create_document
///
/// [Admin] `POST /api/{domain}/{resource}`.
#[utoipa::path(
    post,
    path = "/api/{domain}/{resource}",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
    ),
    responses(
        (status = 201, description = "Record created"),
        (status = 400, description = "Validation failed; meta.errors lists the fields"),
        (status = 401, description = "Missing or invalid admin token")
    )
)]
pub async fn create_document(
    State(controller): State<CrudController>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<WithStatus<Document>> {
    let doc = controller.create(json_body(payload)?).await?;
    Ok(WithStatus(
        StatusCode::CREATED,
        ApiResponse::ok(doc).with_message(format!("{} created", controller.config().name)),
    ))
}

/// update_document
///
/// [Admin] `PUT|PATCH /api/{domain}/{resource}/{id}` with a partial payload.
#[utoipa::path(
    put,
    path = "/api/{domain}/{resource}/{id}",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
        ("id" = Uuid, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No record with this id")
    )
)]
pub async fn update_document(
    State(controller): State<CrudController>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Document>>> {
    let doc = controller.update(&id, json_body(payload)?).await?;
    Ok(Json(
        ApiResponse::ok(doc).with_message(format!("{} updated", controller.config().name)),
    ))
}

/// delete_document
///
/// [Admin] `DELETE /api/{domain}/{resource}/{id}`.
#[utoipa::path(
    delete,
    path = "/api/{domain}/{resource}/{id}",
    params(
        ("domain" = String, Path, description = "Content domain"),
        ("resource" = String, Path, description = "Content resource"),
        ("id" = Uuid, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "No record with this id")
    )
)]
pub async fn delete_document(
    State(controller): State<CrudController>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    controller.delete(&id).await?;
    Ok(Json(
        ApiResponse::ok(json!({ "id": id }))
            .with_message(format!("{} deleted", controller.config().name)),
    ))
}

// --- Page content ---

/// list_pages
///
/// [Public] `GET /api/content`: names of the editable JSON pages.
#[utoipa::path(
    get,
    path = "/api/content",
    responses((status = 200, description = "Page names", body = [String]))
)]
pub async fn list_pages(State(pages): State<PageStore>) -> ApiResult<Json<ApiResponse<Vec<String>>>> {
    Ok(Json(ApiResponse::ok(pages.list().await?)))
}

/// get_page
///
/// [Public] `GET /api/content/{page}`.
#[utoipa::path(
    get,
    path = "/api/content/{page}",
    params(("page" = String, Path, description = "Page name, e.g. home")),
    responses(
        (status = 200, description = "Page JSON"),
        (status = 400, description = "Invalid page name"),
        (status = 404, description = "No such page")
    )
)]
pub async fn get_page(
    State(pages): State<PageStore>,
    Path(page): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    Ok(Json(ApiResponse::ok(pages.read(&page).await?)))
}

/// put_page
///
/// [Admin] `PUT /api/content/{page}`: replaces the whole page document.
#[utoipa::path(
    put,
    path = "/api/content/{page}",
    params(("page" = String, Path, description = "Page name, e.g. home")),
    responses(
        (status = 200, description = "Page saved"),
        (status = 400, description = "Invalid page name or body"),
        (status = 401, description = "Missing or invalid admin token")
    )
)]
pub async fn put_page(
    admin: AdminUser,
    State(pages): State<PageStore>,
    Path(page): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let content = json_body(payload)?;
    if !content.is_object() {
        return Err(ApiError::BadRequest(
            "page content must be a JSON object".to_string(),
        ));
    }
    pages.write(&page, &content).await?;
    tracing::info!(page = %page, admin = %admin.subject, "page content replaced");
    Ok(Json(ApiResponse::ok(content).with_message(format!("page {page} saved"))))
}

// --- Media ---

/// create_presigned_upload
///
/// [Admin] Hands out a short-lived S3 PUT URL for a media file.
#[utoipa::path(
    post,
    path = "/api/admin/uploads/presigned",
    request_body = PresignedUploadRequest,
    responses(
        (status = 200, description = "Upload URL", body = PresignedUploadResponse),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn create_presigned_upload(
    admin: AdminUser,
    State(storage): State<StorageState>,
    payload: Result<Json<PresignedUploadRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<PresignedUploadResponse>>> {
    let payload = json_body(payload)?;
    let resource_key = media_key(&payload.collection, &payload.filename, Uuid::new_v4());

    let upload_url = storage
        .presigned_upload_url(&resource_key, &payload.file_type)
        .await
        .map_err(ApiError::Storage)?;

    tracing::info!(key = %resource_key, admin = %admin.subject, "presigned upload issued");
    Ok(Json(ApiResponse::ok(PresignedUploadResponse {
        upload_url,
        resource_key,
    })))
}
