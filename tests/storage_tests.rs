use site_cms::{
    MockStorageService,
    pages::{PageStore, PageStoreError, is_valid_page_name},
    storage::{StorageService, media_key, sanitize_key},
};
use serde_json::json;
use uuid::Uuid;

// --- Object storage ---

#[tokio::test]
async fn test_mock_storage_success() {
    let storage = MockStorageService::new();
    let url = storage
        .presigned_upload_url("media/articles/cover.jpg", "image/jpeg")
        .await
        .unwrap();

    assert!(url.contains("mock-bucket/media/articles/cover.jpg"));
    assert!(url.contains("signature=fake"));
}

#[tokio::test]
async fn test_mock_storage_failure() {
    let storage = MockStorageService::new_failing();
    let result = storage
        .presigned_upload_url("media/articles/cover.jpg", "image/jpeg")
        .await;

    assert!(result.is_err());
}

#[test]
fn test_sanitize_key_drops_traversal() {
    assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
    assert_eq!(sanitize_key("/media//./a.png"), "media/a.png");
}

#[test]
fn test_media_key_shape() {
    let id = Uuid::new_v4();

    assert_eq!(
        media_key("portfolio_projects", "Quay Wall.PNG", id),
        format!("media/portfolio_projects/{id}.png")
    );
    assert_eq!(
        media_key("../blog/articles", "cover", id),
        format!("media/blog-articles/{id}.bin")
    );
    assert_eq!(media_key("", "x.tar.gz", id), format!("media/misc/{id}.gz"));
    assert_eq!(media_key("articles", "weird.p$g", id), format!("media/articles/{id}.bin"));
}

// --- Page content store ---

fn temp_store() -> PageStore {
    PageStore::new(std::env::temp_dir().join(format!("site-cms-store-{}", Uuid::new_v4())))
}

#[test]
fn test_page_names() {
    assert!(is_valid_page_name("home"));
    assert!(is_valid_page_name("iso-9001"));
    assert!(!is_valid_page_name(""));
    assert!(!is_valid_page_name("../secrets"));
    assert!(!is_valid_page_name("About"));
    assert!(!is_valid_page_name(&"a".repeat(65)));
}

#[tokio::test]
async fn test_page_store_write_read_overwrite() {
    let store = temp_store();

    store.write("about", &json!({ "version": 1 })).await.unwrap();
    store.write("about", &json!({ "version": 2 })).await.unwrap();
    store.write("home", &json!({ "hero": "Hi" })).await.unwrap();

    assert_eq!(store.read("about").await.unwrap(), json!({ "version": 2 }));
    assert_eq!(store.list().await.unwrap(), vec!["about", "home"]);

    let _ = tokio::fs::remove_dir_all(store.root()).await;
}

#[tokio::test]
async fn test_page_store_errors() {
    let store = temp_store();

    assert!(matches!(
        store.read("missing").await,
        Err(PageStoreError::NotFound(_))
    ));
    assert!(matches!(
        store.write("../escape", &json!({})).await,
        Err(PageStoreError::InvalidName(_))
    ));

    tokio::fs::create_dir_all(store.root()).await.unwrap();
    tokio::fs::write(store.root().join("broken.json"), b"{ nope")
        .await
        .unwrap();
    assert!(matches!(
        store.read("broken").await,
        Err(PageStoreError::Corrupt { .. })
    ));

    let _ = tokio::fs::remove_dir_all(store.root()).await;
}
