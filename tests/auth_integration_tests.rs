use axum::{
    Router,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use site_cms::{
    AppConfig, AppState, MemoryRepository, MockStorageService, PageStore,
    auth::{ADMIN_ROLE, AdminUser, LOCAL_BYPASS_HEADER, issue_token},
    config::Env,
    create_router,
    repository::RepositoryState,
    storage::StorageState,
};
use std::sync::Arc;
use tower::util::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn app(env: Env) -> Router {
    let config = AppConfig {
        env,
        jwt_secret: SECRET.to_string(),
        ..AppConfig::default()
    };
    let pages_dir = std::env::temp_dir().join(format!("site-cms-auth-{}", uuid::Uuid::new_v4()));

    create_router(AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        pages: PageStore::new(pages_dir),
        config,
    })
}

fn create_department(auth: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/careers/departments")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((name, value)) = auth {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(
            json!({ "name": "Engineering", "slug": "engineering" }).to_string(),
        ))
        .unwrap()
}

fn bearer(token: &str) -> Option<(&'static str, String)> {
    Some(("authorization", format!("Bearer {token}")))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_write_without_token_is_unauthorized() {
    let response = app(Env::Production)
        .oneshot(create_department(None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_write_with_admin_token_succeeds() {
    let token = issue_token(SECRET, "editor@site", ADMIN_ROLE, 3600).unwrap();

    let response = app(Env::Production)
        .oneshot(create_department(bearer(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["slug"], "engineering");
}

#[tokio::test]
async fn test_non_admin_role_is_forbidden() {
    let token = issue_token(SECRET, "viewer@site", "viewer", 3600).unwrap();

    let response = app(Env::Production)
        .oneshot(create_department(bearer(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    // Well past the default validation leeway.
    let token = issue_token(SECRET, "editor@site", ADMIN_ROLE, -3600).unwrap();

    let response = app(Env::Production)
        .oneshot(create_department(bearer(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "token expired");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let token = issue_token("someone-elses-secret", "editor@site", ADMIN_ROLE, 3600).unwrap();

    let response = app(Env::Production)
        .oneshot(create_department(bearer(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_header() {
    let response = app(Env::Local)
        .oneshot(create_department(Some((LOCAL_BYPASS_HEADER, "dev".to_string()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_local_bypass_header_ignored_in_production() {
    let response = app(Env::Production)
        .oneshot(create_department(Some((LOCAL_BYPASS_HEADER, "dev".to_string()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reads_are_public() {
    let response = app(Env::Production)
        .oneshot(
            Request::builder()
                .uri("/api/careers/departments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_page_write_requires_admin() {
    let response = app(Env::Production)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/content/home")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "hero": "Welcome" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let response = app(Env::Production)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/blog/articles/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_user_carries_role() {
    let config = AppConfig {
        env: Env::Local,
        jwt_secret: SECRET.to_string(),
        ..AppConfig::default()
    };

    let (mut parts, _) = Request::builder()
        .header(LOCAL_BYPASS_HEADER, "site-owner")
        .body(())
        .unwrap()
        .into_parts();
    let admin = AdminUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap();
    assert_eq!(admin.subject, "site-owner");
    assert_eq!(admin.role, ADMIN_ROLE);

    let token = issue_token(SECRET, "editor@site", ADMIN_ROLE, 3600).unwrap();
    let (mut parts, _) = Request::builder()
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(())
        .unwrap()
        .into_parts();
    let admin = AdminUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap();
    assert_eq!(admin.subject, "editor@site");
    assert_eq!(admin.role, ADMIN_ROLE);
}
