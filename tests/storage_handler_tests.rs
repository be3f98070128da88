use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use site_cms::{
    AppConfig, AppState, MemoryRepository, MockStorageService, PageStore,
    auth::LOCAL_BYPASS_HEADER, create_router, models::PresignedUploadResponse,
    repository::RepositoryState, response::ApiResponse, storage::StorageState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

fn temp_content_dir() -> PathBuf {
    std::env::temp_dir().join(format!("site-cms-pages-{}", Uuid::new_v4()))
}

fn app_with(storage: MockStorageService, content_dir: PathBuf) -> Router {
    create_router(AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        pages: PageStore::new(content_dir),
        config: AppConfig::default(),
    })
}

fn admin_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(LOCAL_BYPASS_HEADER, "test-admin")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Media uploads ---

#[tokio::test]
async fn test_presigned_upload_success() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/admin/uploads/presigned",
            json!({
                "filename": "Site Photo.JPG",
                "file_type": "image/jpeg",
                "collection": "portfolio_projects"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiResponse<PresignedUploadResponse> = serde_json::from_slice(&bytes).unwrap();
    let data = body.data.expect("upload payload");

    assert!(data.resource_key.starts_with("media/portfolio_projects/"));
    assert!(data.resource_key.ends_with(".jpg"));
    assert!(data.upload_url.contains(&data.resource_key));
}

#[tokio::test]
async fn test_presigned_upload_storage_failure_is_generic_500() {
    let app = app_with(MockStorageService::new_failing(), temp_content_dir());

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/admin/uploads/presigned",
            json!({ "filename": "a.png", "file_type": "image/png", "collection": "articles" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "An unexpected error occurred");
    assert!(!body.to_string().contains("mock storage failure"));
}

#[tokio::test]
async fn test_presigned_upload_malformed_body() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/admin/uploads/presigned",
            json!({ "filename": "a.png" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Bad request");
}

// --- Page content ---

#[tokio::test]
async fn test_page_round_trip_through_router() {
    let dir = temp_content_dir();
    let app = app_with(MockStorageService::new(), dir.clone());
    let home = json!({ "hero": { "title": "Building the future" }, "stats": [12, 40] });

    let saved = app
        .clone()
        .oneshot(admin_request("PUT", "/api/content/home", home.clone()))
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);

    let fetched = app.clone().oneshot(get("/api/content/home")).await.unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(body_json(fetched).await["data"], home);

    let listed = app.oneshot(get("/api/content")).await.unwrap();
    assert_eq!(body_json(listed).await["data"], json!(["home"]));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app.oneshot(get("/api/content/about")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not found");
}

#[tokio::test]
async fn test_invalid_page_name_is_bad_request() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app
        .oneshot(admin_request("PUT", "/api/content/Home_Page", json!({ "a": 1 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_body_must_be_object() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app
        .oneshot(admin_request("PUT", "/api/content/home", json!(["not", "a", "page"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_list_empty_without_content_dir() {
    let app = app_with(MockStorageService::new(), temp_content_dir());

    let response = app.oneshot(get("/api/content")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));
}
