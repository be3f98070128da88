use reqwest::StatusCode;
use serde_json::{Value, json};
use site_cms::{
    AppConfig, AppState, MemoryRepository, MockStorageService, PageStore,
    auth::{ADMIN_ROLE, issue_token},
    config::Env,
    create_router,
    repository::RepositoryState,
    storage::StorageState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

const SECRET: &str = "api-test-secret";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub token: String,
}

async fn spawn_app() -> TestApp {
    let config = AppConfig {
        env: Env::Production,
        jwt_secret: SECRET.to_string(),
        ..AppConfig::default()
    };
    let content_dir = std::env::temp_dir().join(format!("site-cms-api-{}", Uuid::new_v4()));

    let state = AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        pages: PageStore::new(content_dir),
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let token = issue_token(SECRET, "editor@site", ADMIN_ROLE, 3600).unwrap();
    TestApp { address, token }
}

fn project(title: &str, slug: &str, year: i64, featured: bool) -> Value {
    json!({
        "title": title,
        "slug": slug,
        "category": "infrastructure",
        "description": "Dual carriageway with two interchanges.",
        "client": "County Council",
        "location": "Limerick",
        "year": year,
        "featured": featured,
        "status": "published"
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_article_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let base = format!("{}/api/blog/articles", app.address);

    // 1. Create
    let created = client
        .post(&base)
        .bearer_auth(&app.token)
        .json(&json!({
            "title": "New depot opens",
            "slug": "new-depot-opens",
            "content": "The northern depot is now operational.",
            "tags": ["depots"]
        }))
        .send()
        .await
        .expect("create fail");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "article created");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    // 2. Read by id and slug
    let by_id: Value = client
        .get(format!("{base}/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id["data"]["title"], "New depot opens");

    let by_slug: Value = client
        .get(format!("{base}/slug/new-depot-opens"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_slug["data"]["id"], id.as_str());

    // 3. Partial update
    let updated = client
        .patch(format!("{base}/{id}"))
        .bearer_auth(&app.token)
        .json(&json!({ "status": "published" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["data"]["status"], "published");
    assert_eq!(updated["data"]["title"], "New depot opens");

    // 4. Views
    for _ in 0..3 {
        let viewed = client
            .post(format!("{base}/{id}/views"))
            .send()
            .await
            .unwrap();
        assert_eq!(viewed.status(), StatusCode::OK);
    }
    let after_views: Value = client
        .get(format!("{base}/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after_views["data"]["views"], 3);

    // 5. Delete, then delete again
    let deleted = client
        .delete(format!("{base}/{id}"))
        .bearer_auth(&app.token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let again = client
        .delete(format!("{base}/{id}"))
        .bearer_auth(&app.token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let gone = client.get(format!("{base}/{id}")).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_reported_per_field() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/portfolio/projects", app.address))
        .bearer_auth(&app.token)
        .json(&json!({ "title": "Bridge", "slug": "Not A Slug", "year": 1492 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation failed");

    let fields: Vec<&str> = body["meta"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"slug"));
    assert!(fields.contains(&"year"));
    assert!(fields.contains(&"category"));
    assert!(fields.contains(&"description"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/blog/articles", app.address))
        .bearer_auth(&app.token)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Bad request");
}

#[tokio::test]
async fn test_portfolio_listing_filters_and_pagination() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let base = format!("{}/api/portfolio/projects", app.address);

    let seeds = [
        ("Ring road", "ring-road", 2015, false),
        ("Harbour wall", "harbour-wall", 2019, true),
        ("Rail bridge", "rail-bridge", 2021, true),
        ("Water works", "water-works", 2023, false),
    ];
    for (title, slug, year, featured) in seeds {
        let response = client
            .post(&base)
            .bearer_auth(&app.token)
            .json(&project(title, slug, year, featured))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let featured: Value = client
        .get(format!("{base}?featured=true&year[gte]=2020&unknown=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(featured["meta"]["total"], 1);
    assert_eq!(featured["data"][0]["slug"], "rail-bridge");
    assert_eq!(featured["meta"]["filters"]["featured"], "true");
    assert_eq!(featured["meta"]["filters"]["year[gte]"], "2020");
    assert!(featured["meta"]["filters"].get("unknown").is_none());

    let sorted: Value = client
        .get(format!("{base}?sort=year&limit=2&page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sorted["meta"]["total"], 4);
    assert_eq!(sorted["meta"]["total_pages"], 2);
    assert_eq!(sorted["meta"]["page"], 2);
    let slugs: Vec<&str> = sorted["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["slug"].as_str())
        .collect();
    assert_eq!(slugs, vec!["rail-bridge", "water-works"]);

    let searched: Value = client
        .get(format!("{base}?q=harbour"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(searched["meta"]["total"], 1);
    assert_eq!(searched["meta"]["search"], "harbour");
}

#[tokio::test]
async fn test_concurrent_views_are_not_lost() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let base = format!("{}/api/careers/positions", app.address);

    let created: Value = client
        .post(&base)
        .bearer_auth(&app.token)
        .json(&json!({
            "title": "Site Engineer",
            "department": "Engineering",
            "location": "Cork",
            "description": "Supervise civil works on site.",
            "employment_type": "full-time",
            "status": "active"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = format!("{base}/{id}/views");
        handles.push(tokio::spawn(async move {
            client.post(url).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let fetched: Value = client
        .get(format!("{base}/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["data"]["views"], 20);
}

#[tokio::test]
async fn test_types_without_slug_or_counter_expose_no_such_routes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Positions have no slug route; "slug" is taken as an id segment.
    let by_slug = client
        .get(format!("{}/api/careers/positions/slug/anything", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(by_slug.status(), StatusCode::NOT_FOUND);

    let views = client
        .post(format!(
            "{}/api/portfolio/categories/{}/views",
            app.address,
            Uuid::new_v4()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(views.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_content_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/content/iso", app.address);

    let missing = client.get(&url).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let unauthorized = client
        .put(&url)
        .json(&json!({ "certificates": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let page = json!({ "certificates": ["ISO 9001", "ISO 45001"] });
    let saved = client
        .put(&url)
        .bearer_auth(&app.token)
        .json(&page)
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);

    let fetched: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["data"], page);
}
