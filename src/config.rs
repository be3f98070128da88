use std::env;
use std::path::PathBuf;

/// AppConfig
///
/// Holds the service configuration resolved from the environment at startup.
/// Immutable once loaded and shared with handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local admin bypass and log format.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Postgres connection string. `None` selects the in-memory document store (local only).
    pub db_url: Option<String>,
    // HS256 secret used to validate admin JWTs.
    pub jwt_secret: String,
    // Directory holding the JSON page documents edited from the admin panel.
    pub content_dir: PathBuf,
    // S3-compatible storage for admin media uploads.
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
}

/// Env
///
/// Runtime context: local development (in-memory store allowed, header bypass for
/// admin auth, pretty logs) or production (everything explicit, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "local-admin-secret-change-me";

impl Default for AppConfig {
    /// Non-panicking configuration for tests and state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            content_dir: PathBuf::from("content"),
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "site-media-test".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL`, `ADMIN_JWT_SECRET` or the S3
    /// credentials are missing, so the service never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let content_dir =
            PathBuf::from(env::var("CONTENT_DIR").unwrap_or_else(|_| "content".to_string()));

        match env {
            Env::Local => Self {
                env: Env::Local,
                bind_addr,
                // Without DATABASE_URL the service runs on the in-memory store.
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("ADMIN_JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                content_dir,
                // Dockerized MinIO defaults.
                s3_endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                s3_region: "us-east-1".to_string(),
                s3_key: "admin".to_string(),
                s3_secret: "password".to_string(),
                s3_bucket: "site-media".to_string(),
            },
            Env::Production => Self {
                env: Env::Production,
                bind_addr,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                jwt_secret: env::var("ADMIN_JWT_SECRET")
                    .expect("FATAL: ADMIN_JWT_SECRET must be set in production."),
                content_dir,
                s3_endpoint: env::var("S3_ENDPOINT").expect("FATAL: S3_ENDPOINT required in prod"),
                s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_key: env::var("S3_ACCESS_KEY").expect("FATAL: S3_ACCESS_KEY required in prod"),
                s3_secret: env::var("S3_SECRET_KEY")
                    .expect("FATAL: S3_SECRET_KEY required in prod"),
                s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "site-media".to_string()),
            },
        }
    }
}
